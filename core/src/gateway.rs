//! AI assistant gateway: one conversation in, one normalized reply out.
//!
//! Providers are tried strictly one after another in [`ProviderKind::PRIORITY`]
//! order. A failed attempt is logged and the next configured provider takes
//! over; only the terminal outcome reaches the caller.

use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use crate::agents::config::ProviderSettings;
use crate::agents::markup::strip_emphasis;
use crate::agents::providers::{build_http_client, build_provider};
use crate::agents::{ChatProvider, Conversation, ConversationTurn, ProviderError, ProviderKind};
use crate::errors::GatewayError;
use crate::prompt::{self, PromptSection};
use crate::settings::ConfigSnapshot;

const ENHANCE_INSTRUCTIONS: &str = "You are an expert prompt engineer. Improve the system prompt supplied by the user so that an AI assistant for a creative agency follows it more reliably: make instructions clear, specific and well organised. Keep the existing \"## \" section headers convention, one header line per section. Return only the improved system prompt text, with no commentary before or after it.";

/// Provider-agnostic reply text, post-processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedReply {
    pub text: String,
    pub provider: ProviderKind,
}

/// Improved prompt document together with its parsed sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancedPrompt {
    pub prompt: String,
    pub sections: Vec<PromptSection>,
    pub provider: ProviderKind,
}

/// Providers eligible for one invocation. `primary` is always the
/// first-priority provider, `fallback` the second.
#[derive(Clone, Default)]
pub struct ProviderLineup {
    primary: Option<Arc<dyn ChatProvider>>,
    fallback: Option<Arc<dyn ChatProvider>>,
}

impl ProviderLineup {
    pub fn new(
        primary: Option<Arc<dyn ChatProvider>>,
        fallback: Option<Arc<dyn ChatProvider>>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.fallback.is_none()
    }

    pub fn primary(&self) -> Option<&Arc<dyn ChatProvider>> {
        self.primary.as_ref()
    }

    fn ordered(&self) -> impl Iterator<Item = &Arc<dyn ChatProvider>> {
        self.primary.iter().chain(self.fallback.iter())
    }
}

/// Owns the outbound HTTP client and turns snapshots into provider lineups.
pub struct AiGateway {
    client: Client,
}

impl AiGateway {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Adapters for every provider that has a credential in `snapshot`.
    pub fn lineup(&self, snapshot: &ConfigSnapshot) -> ProviderLineup {
        let [first, second] = ProviderKind::PRIORITY.map(|kind| {
            ProviderSettings::from_snapshot(kind, snapshot)
                .map(|settings| build_provider(settings, self.client.clone()))
        });
        ProviderLineup::new(first, second)
    }

    /// Answer `message` in the context of `history` using the prompt and
    /// credentials from `snapshot`.
    pub async fn chat(
        &self,
        snapshot: &ConfigSnapshot,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<NormalizedReply, GatewayError> {
        let lineup = self.lineup(snapshot);
        chat_with(&lineup, snapshot.system_prompt(), message, history).await
    }

    /// Ask the first-priority provider to rewrite `document`. No fallback.
    pub async fn enhance_prompt(
        &self,
        snapshot: &ConfigSnapshot,
        document: &str,
    ) -> Result<EnhancedPrompt, GatewayError> {
        let lineup = self.lineup(snapshot);
        enhance_with(&lineup, document).await
    }
}

/// Fallback loop over an explicit lineup.
pub async fn chat_with(
    lineup: &ProviderLineup,
    system_prompt: Option<&str>,
    message: &str,
    history: &[ConversationTurn],
) -> Result<NormalizedReply, GatewayError> {
    if message.trim().is_empty() {
        return Err(GatewayError::InputInvalid(
            "Please enter a message.".to_string(),
        ));
    }
    if lineup.is_empty() {
        log::warn!("AI chat requested but no provider credential is configured");
        return Err(GatewayError::ConfigurationMissing);
    }

    let conversation = Conversation::assemble(system_prompt, history, message);

    let mut attempted = Vec::new();
    for provider in lineup.ordered() {
        let kind = provider.kind();
        attempted.push(kind);
        log::debug!(
            "sending {} turn(s) to {}",
            conversation.turns().len(),
            kind.id()
        );
        match provider.complete(&conversation).await {
            Ok(text) => {
                return Ok(NormalizedReply {
                    text: strip_emphasis(&text),
                    provider: kind,
                });
            }
            Err(err) => log_attempt_failure(kind, &err),
        }
    }

    log::error!(
        "AI chat failed on every configured provider: {}",
        attempted.iter().map(|k| k.id()).collect::<Vec<_>>().join(", ")
    );
    Err(GatewayError::AllProvidersFailed { attempted })
}

/// Prompt enhancement against the primary provider only.
pub async fn enhance_with(
    lineup: &ProviderLineup,
    document: &str,
) -> Result<EnhancedPrompt, GatewayError> {
    if document.trim().is_empty() {
        return Err(GatewayError::InputInvalid(
            "There is no prompt to enhance.".to_string(),
        ));
    }
    let Some(provider) = lineup.primary() else {
        log::warn!("prompt enhancement requested but the primary provider is not configured");
        return Err(GatewayError::ConfigurationMissing);
    };

    let request = format!("Improve this system prompt:\n\n{}", document.trim());
    let conversation = Conversation::assemble(Some(ENHANCE_INSTRUCTIONS), &[], &request);
    let kind = provider.kind();
    match provider.complete(&conversation).await {
        Ok(text) => Ok(EnhancedPrompt {
            sections: prompt::parse(&text),
            prompt: text,
            provider: kind,
        }),
        Err(err) => {
            log_attempt_failure(kind, &err);
            Err(GatewayError::ProviderCallFailed { provider: kind })
        }
    }
}

fn log_attempt_failure(kind: ProviderKind, err: &ProviderError) {
    match err {
        ProviderError::InvalidApiKey { status, .. } => log::error!(
            "{} rejected the configured API key (HTTP {status}); check the site settings",
            kind.display_name()
        ),
        other => log::warn!("{} call failed: {other}", kind.display_name()),
    }
}
