use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ensure_success, non_empty, ChatProvider, ProviderError};
use crate::agents::config::{ProviderKind, ProviderSettings, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::agents::conversation::Conversation;

/// Chat completions adapter. The system turn stays inline in `messages`.
pub struct OpenAiProvider {
    settings: ProviderSettings,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings, client: Client) -> Self {
        Self { settings, client }
    }

    fn request_body<'a>(&'a self, conversation: &'a Conversation) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.settings.model,
            messages: conversation
                .turns()
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, ProviderError> {
        let url = self.settings.endpoint("/v1/chat/completions");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(conversation))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: ChatCompletionResponse = response
            .json()
            .await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);
        non_empty(content)
    }
}
