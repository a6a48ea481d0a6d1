use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::PathBuf;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Open (or create) `atelier.db` inside `data_dir` and bring the schema up to date.
pub fn init_db(data_dir: PathBuf) -> Result<DbPool> {
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    let db_path = data_dir.join("atelier.db");
    let mgr = SqliteConnectionManager::file(&db_path);
    let pool = Pool::new(mgr)?;
    {
        let conn = pool.get()?;
        apply_migrations(&conn)?;
    }
    Ok(pool)
}

pub(crate) fn apply_migrations(conn: &Connection) -> Result<()> {
    let migrations: &[(&str, &str)] = &[
        (
            "0001_site_settings.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../migrations/0001_site_settings.sql"
            )),
        ),
        (
            "0002_event_log.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../migrations/0002_event_log.sql"
            )),
        ),
        (
            "0003_chat_messages.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../migrations/0003_chat_messages.sql"
            )),
        ),
    ];

    for (name, sql) in migrations {
        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration {name}"))?;
    }
    Ok(())
}

/// Single-connection in-memory pool with the schema applied.
#[cfg(test)]
pub(crate) fn memory_pool() -> DbPool {
    let pool = Pool::builder()
        .max_size(1)
        .build(SqliteConnectionManager::memory())
        .unwrap();
    apply_migrations(&pool.get().unwrap()).unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_db_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_db(dir.path().join("nested")).unwrap();
        let conn = pool.get().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert!(names.contains(&"site_settings".to_string()));
        assert!(names.contains(&"event_log".to_string()));
        assert!(names.contains(&"chat_messages".to_string()));
    }

    #[test]
    fn migrations_are_idempotent() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        apply_migrations(&conn).unwrap();
    }
}
