//! Site settings as seen by the AI assistant.
//!
//! Settings arrive as loose `{setting_key, setting_value}` rows and are
//! folded into a [`ConfigSnapshot`] on every request. Nothing is cached.

pub mod store;

use std::collections::HashMap;

pub use store::{SettingsStore, SqliteSettingsStore};

pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const OPENAI_MODEL: &str = "openai_model";
pub const OPENAI_BASE_URL: &str = "openai_base_url";
pub const ANTHROPIC_API_KEY: &str = "anthropic_api_key";
pub const ANTHROPIC_MODEL: &str = "anthropic_model";
pub const ANTHROPIC_BASE_URL: &str = "anthropic_base_url";
pub const SYSTEM_PROMPT: &str = "ai_system_prompt";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// One row of the settings table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRow {
    pub setting_key: String,
    pub setting_value: Option<String>,
}

impl SettingsRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            setting_key: key.into(),
            setting_value: Some(value.into()),
        }
    }
}

/// Read-only key/value view of the settings at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    values: HashMap<String, String>,
}

impl ConfigSnapshot {
    /// Fold rows into a snapshot. Later rows win over earlier ones with the
    /// same key; `None` gives an empty snapshot.
    pub fn resolve<I>(rows: Option<I>) -> Self
    where
        I: IntoIterator<Item = SettingsRow>,
    {
        let mut values = HashMap::new();
        for row in rows.into_iter().flatten() {
            values.insert(row.setting_key, row.setting_value.unwrap_or_default());
        }
        Self { values }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::resolve(Some(
            pairs.into_iter().map(|(k, v)| SettingsRow::new(k, v)),
        ))
    }

    /// Raw lookup, including blank values.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Trimmed value, or `None` when the key is missing or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        self.get(OPENAI_API_KEY)
    }

    pub fn openai_model(&self) -> &str {
        self.get(OPENAI_MODEL).unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    pub fn openai_base_url(&self) -> &str {
        self.get(OPENAI_BASE_URL).unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.get(ANTHROPIC_API_KEY)
    }

    pub fn anthropic_model(&self) -> &str {
        self.get(ANTHROPIC_MODEL).unwrap_or(DEFAULT_ANTHROPIC_MODEL)
    }

    pub fn anthropic_base_url(&self) -> &str {
        self.get(ANTHROPIC_BASE_URL)
            .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL)
    }

    /// The active flat prompt document, untrimmed.
    pub fn system_prompt(&self) -> Option<&str> {
        self.raw(SYSTEM_PROMPT).filter(|v| !v.trim().is_empty())
    }
}
