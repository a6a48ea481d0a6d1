//! Provider adapters behind a single [`ChatProvider`] capability.
//!
//! Each adapter owns its wire format. The gateway only ever sees
//! `Arc<dyn ChatProvider>` and a [`ProviderError`] on failure.

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use thiserror::Error;

use super::config::{ProviderKind, ProviderSettings, REQUEST_TIMEOUT, USER_AGENT};
use super::conversation::Conversation;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Longest slice of an error body kept for logs.
const ERROR_BODY_LIMIT: usize = 500;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Send the conversation and return the reply text, never empty.
    async fn complete(&self, conversation: &Conversation) -> Result<String, ProviderError>;
}

/// Why a single provider attempt failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("API key rejected (HTTP {status}): {body}")]
    InvalidApiKey { status: u16, body: String },
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable response body: {0}")]
    MalformedBody(String),
    #[error("provider returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedBody(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Shared outbound client for both adapters.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to construct HTTP client")
}

/// Adapter for the given provider settings.
pub fn build_provider(settings: ProviderSettings, client: Client) -> Arc<dyn ChatProvider> {
    match settings.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(settings, client)),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(settings, client)),
    }
}

/// Pass 2xx responses through; turn anything else into a classified error.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if status.as_u16() == 401 && is_invalid_key_body(&body) {
        return Err(ProviderError::InvalidApiKey {
            status: status.as_u16(),
            body,
        });
    }
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

fn is_invalid_key_body(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let error = &value["error"];
    error["code"].as_str() == Some("invalid_api_key")
        || error["type"].as_str() == Some("authentication_error")
}

/// Trimmed reply text, or [`ProviderError::EmptyReply`].
pub(crate) fn non_empty(text: Option<String>) -> Result<String, ProviderError> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ProviderError::EmptyReply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn invalid_key_bodies_are_recognised() {
        assert!(is_invalid_key_body(
            r#"{"error":{"message":"Incorrect API key provided","code":"invalid_api_key"}}"#
        ));
        assert!(is_invalid_key_body(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#
        ));
        assert!(!is_invalid_key_body(r#"{"error":{"code":"rate_limit_exceeded"}}"#));
        assert!(!is_invalid_key_body("<html>bad gateway</html>"));
    }

    #[test]
    fn non_empty_rejects_blank_text() {
        assert!(matches!(non_empty(None), Err(ProviderError::EmptyReply)));
        assert!(matches!(
            non_empty(Some("  \n".into())),
            Err(ProviderError::EmptyReply)
        ));
        assert_eq!(non_empty(Some(" Hello ".into())).unwrap(), "Hello");
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(Duration::from_millis(1500));
                br#"{"choices":[{"message":{"content":"too late"}}]}"#.to_vec()
            })
            .create_async()
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let provider = build_provider(
            ProviderSettings {
                kind: ProviderKind::OpenAi,
                api_key: "sk-test".into(),
                model: "gpt-4o-mini".into(),
                base_url: server.url(),
            },
            client,
        );
        let conversation = Conversation::assemble(None, &[], "hello");
        let err = provider.complete(&conversation).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout), "got {err:?}");
    }
}
