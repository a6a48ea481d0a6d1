use std::time::Duration;

use serde::Serialize;

use crate::settings::ConfigSnapshot;

/// Sampling temperature sent to providers that accept one.
pub const TEMPERATURE: f32 = 0.7;
/// Upper bound on reply length for every provider call.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;
/// Per-request timeout on the shared HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const USER_AGENT: &str = "Atelier-Assistant/0.1";

/// The two supported providers, in fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub const PRIORITY: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Anthropic];

    pub fn id(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }
}

/// Everything an adapter needs to call one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl ProviderSettings {
    /// `None` when the snapshot holds no usable credential for `kind`.
    pub fn from_snapshot(kind: ProviderKind, snapshot: &ConfigSnapshot) -> Option<Self> {
        let (api_key, model, base_url) = match kind {
            ProviderKind::OpenAi => (
                snapshot.openai_api_key()?,
                snapshot.openai_model(),
                snapshot.openai_base_url(),
            ),
            ProviderKind::Anthropic => (
                snapshot.anthropic_api_key()?,
                snapshot.anthropic_model(),
                snapshot.anthropic_base_url(),
            ),
        };
        Some(Self {
            kind,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
