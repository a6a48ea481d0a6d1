//! Append-only log of finished assistant exchanges.
//!
//! The gateway never reads from here; history always comes from the caller.

use anyhow::{Context, Result};
use r2d2_sqlite::rusqlite::params;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::DbPool;
use crate::gateway::NormalizedReply;

#[derive(Clone, Debug)]
pub struct LoggedMessage {
    pub id: String,
    pub exchange_id: String,
    pub role: String,
    pub content: String,
    pub provider_id: Option<String>,
    pub created_at: i64,
}

pub trait ConversationStore: Send + Sync {
    /// Store the user message and the reply; returns the exchange id.
    fn record_exchange(&self, user_message: &str, reply: &NormalizedReply) -> Result<String>;

    fn list_exchange(&self, exchange_id: &str) -> Result<Vec<LoggedMessage>>;
}

#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DbPool,
}

impl SqliteConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ConversationStore for SqliteConversationStore {
    fn record_exchange(&self, user_message: &str, reply: &NormalizedReply) -> Result<String> {
        let mut conn = self.pool.get().context("failed to get chat log connection")?;
        let exchange_id = Uuid::new_v4().to_string();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO chat_messages (id, exchange_id, role, content, provider_id, created_at) VALUES (?1, ?2, 'user', ?3, NULL, ?4)",
            params![Uuid::new_v4().to_string(), exchange_id, user_message, now],
        )?;
        tx.execute(
            "INSERT INTO chat_messages (id, exchange_id, role, content, provider_id, created_at) VALUES (?1, ?2, 'assistant', ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                exchange_id,
                reply.text,
                reply.provider.id(),
                now
            ],
        )?;
        tx.commit()?;
        Ok(exchange_id)
    }

    fn list_exchange(&self, exchange_id: &str) -> Result<Vec<LoggedMessage>> {
        let conn = self.pool.get().context("failed to get chat log connection")?;
        let mut stmt = conn.prepare(
            "SELECT id, exchange_id, role, content, provider_id, created_at FROM chat_messages WHERE exchange_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([exchange_id], |row| {
            Ok(LoggedMessage {
                id: row.get(0)?,
                exchange_id: row.get(1)?,
                role: row.get(2)?,
                content: row.get(3)?,
                provider_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}
