use r2d2_sqlite::rusqlite::{params, Connection};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append a row to `event_log`. Modules use dotted names such as `ai.runtime`.
pub fn log_event(
    conn: &Connection,
    level: &str,
    code: Option<&str>,
    module: &str,
    message: &str,
    explain: Option<&str>,
    data: Option<Value>,
) -> rusqlite::Result<()> {
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let data_str = data.map(|v| v.to_string());
    conn.execute(
        "INSERT INTO event_log (id, ts, level, code, module, message, explain, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, ts, level, code, module, message, explain, data_str],
    )?;
    Ok(())
}

/// Count rows for a module; used by diagnostics and tests.
pub fn count_events(conn: &Connection, module: &str, code: Option<&str>) -> rusqlite::Result<i64> {
    match code {
        Some(code) => conn.query_row(
            "SELECT COUNT(1) FROM event_log WHERE module = ?1 AND code = ?2",
            params![module, code],
            |row| row.get(0),
        ),
        None => conn.query_row(
            "SELECT COUNT(1) FROM event_log WHERE module = ?1",
            params![module],
            |row| row.get(0),
        ),
    }
}
