use anyhow::{Context, Result};
use r2d2_sqlite::rusqlite::params;
use time::OffsetDateTime;

use super::{ConfigSnapshot, SettingsRow};
use crate::db::DbPool;

/// Bulk read access to the site settings table.
pub trait SettingsStore: Send + Sync {
    fn load_rows(&self) -> Result<Vec<SettingsRow>>;

    /// Fresh snapshot of the current rows.
    fn snapshot(&self) -> Result<ConfigSnapshot> {
        Ok(ConfigSnapshot::resolve(Some(self.load_rows()?)))
    }
}

/// [`SettingsStore`] over the `site_settings` table.
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: DbPool,
}

impl SqliteSettingsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a single setting.
    pub fn save(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.pool.get().context("failed to get settings connection")?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        conn.execute(
            "INSERT INTO site_settings (setting_key, setting_value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(setting_key) DO UPDATE SET setting_value = excluded.setting_value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load_rows(&self) -> Result<Vec<SettingsRow>> {
        let conn = self.pool.get().context("failed to get settings connection")?;
        let mut stmt = conn.prepare(
            "SELECT setting_key, setting_value FROM site_settings ORDER BY updated_at, rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SettingsRow {
                setting_key: row.get(0)?,
                setting_value: row.get(1)?,
            })
        })?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }
}
