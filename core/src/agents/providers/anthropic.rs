use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ensure_success, non_empty, ChatProvider, ProviderError};
use crate::agents::config::{ProviderKind, ProviderSettings, ANTHROPIC_VERSION, MAX_OUTPUT_TOKENS};
use crate::agents::conversation::{Conversation, Role};

/// Messages API adapter. The system turn moves to the top-level `system`
/// field and no temperature is sent.
pub struct AnthropicProvider {
    settings: ProviderSettings,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings, client: Client) -> Self {
        Self { settings, client }
    }

    fn request_body<'a>(&'a self, conversation: &'a Conversation) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.settings.model,
            system: conversation.system_prompt(),
            messages: conversation
                .dialogue()
                .map(|turn| WireMessage {
                    role: match turn.role {
                        Role::Assistant => "assistant",
                        _ => "user",
                    },
                    content: &turn.content,
                })
                .collect(),
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, ProviderError> {
        let url = self.settings.endpoint("/v1/messages");
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(conversation))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: MessagesResponse = response
            .json()
            .await?;

        let text = body
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text);
        non_empty(text)
    }
}
