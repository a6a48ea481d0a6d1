//! Version 1 of the HTTP API consumed by the website.
//!
//! Handlers stay thin: they load a fresh settings snapshot, hand the work to
//! the gateway and map the outcome to `{message}` / `{prompt}` on success or
//! `{error}` with a status code on failure.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tokio::task::spawn_blocking;

use crate::agents::{ConversationTurn, ProviderKind};
use crate::chat_log::ConversationStore;
use crate::db::DbPool;
use crate::errors::GatewayError;
use crate::gateway::{AiGateway, NormalizedReply};
use crate::logging::log_event;
use crate::prompt::{self, PromptDocument, PromptSection};
use crate::settings::{ConfigSnapshot, SettingsStore, SqliteSettingsStore, SYSTEM_PROMPT};

/// Shared state injected into each handler.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub gateway: Arc<AiGateway>,
    pub settings: SqliteSettingsStore,
    pub conversations: Arc<dyn ConversationStore>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/prompt", get(get_prompt).put(save_prompt))
        .route("/api/prompt/enhance", post(enhance_prompt))
        .with_state(state)
}

/// `{error}` body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        log::error!("{context}: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong on our side. Please try again later.".to_string(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match err {
            GatewayError::InputInvalid(_) => StatusCode::BAD_REQUEST,
            GatewayError::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ProviderCallFailed { .. } | GatewayError::AllProvidersFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        log::debug!("rejected request body: {rejection}");
        Self::bad_request("The request body is not valid JSON for this endpoint.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Health check for load balancers and the admin dashboard.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "conversationHistory")]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatOutput {
    pub message: String,
}

/// Answer a visitor message through the provider gateway.
pub async fn chat(
    State(state): State<ApiState>,
    input: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChatOutput>, ApiError> {
    let Json(input) = input?;
    let snapshot = load_snapshot(&state).await?;
    let outcome = state
        .gateway
        .chat(&snapshot, &input.message, &input.conversation_history)
        .await;
    record_outcome(&state.db, "chat", &outcome).await;
    let reply = outcome?;

    let conversations = state.conversations.clone();
    let message = input.message.clone();
    let logged = reply.clone();
    let stored = spawn_blocking(move || conversations.record_exchange(&message, &logged)).await;
    match stored {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => log::warn!("failed to record chat exchange: {err}"),
        Err(err) => log::warn!("chat log task failed: {err}"),
    }

    Ok(Json(ChatOutput {
        message: reply.text,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EnhanceInput {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PromptOutput {
    pub prompt: String,
    pub sections: Vec<PromptSection>,
}

/// Rewrite the supplied prompt with the primary provider.
pub async fn enhance_prompt(
    State(state): State<ApiState>,
    input: Result<Json<EnhanceInput>, JsonRejection>,
) -> Result<Json<PromptOutput>, ApiError> {
    let Json(input) = input?;
    let snapshot = load_snapshot(&state).await?;
    let outcome = state.gateway.enhance_prompt(&snapshot, &input.prompt).await;
    match &outcome {
        Ok(enhanced) => {
            record_success(&state.db, "enhance", enhanced.provider, &enhanced.prompt).await
        }
        Err(err) => record_failure(&state.db, "enhance", err).await,
    }
    let enhanced = outcome?;
    Ok(Json(PromptOutput {
        prompt: enhanced.prompt,
        sections: enhanced.sections,
    }))
}

/// Current system prompt, flat and as sections.
pub async fn get_prompt(State(state): State<ApiState>) -> Result<Json<PromptOutput>, ApiError> {
    let snapshot = load_snapshot(&state).await?;
    let prompt = snapshot.system_prompt().unwrap_or_default().to_string();
    Ok(Json(PromptOutput {
        sections: prompt::parse(&prompt),
        prompt,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SectionInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SavePromptInput {
    #[serde(default)]
    pub sections: Vec<SectionInput>,
}

/// Flatten edited sections and store them as the active system prompt.
pub async fn save_prompt(
    State(state): State<ApiState>,
    input: Result<Json<SavePromptInput>, JsonRejection>,
) -> Result<Json<PromptOutput>, ApiError> {
    let Json(input) = input?;
    if input.sections.is_empty() {
        return Err(ApiError::bad_request("A prompt needs at least one section."));
    }
    let sections = input
        .sections
        .into_iter()
        .map(|s| PromptSection {
            id: s.id.unwrap_or_default(),
            name: s.name,
            content: s.content,
        })
        .collect();
    let prompt = PromptDocument::from_sections(sections).flatten();

    let settings = state.settings.clone();
    let pool = state.db.clone();
    let value = prompt.clone();
    spawn_blocking(move || -> anyhow::Result<()> {
        settings.save(SYSTEM_PROMPT, &value)?;
        let conn = pool.get()?;
        log_event(
            &conn,
            "info",
            Some("AI-0100"),
            "ai.settings",
            "System prompt updated",
            Some("Saved from the prompt builder"),
            Some(json!({ "length": value.len() })),
        )?;
        Ok(())
    })
    .await
    .map_err(|err| ApiError::internal("prompt save task failed", err))?
    .map_err(|err| ApiError::internal("failed to save system prompt", err))?;

    Ok(Json(PromptOutput {
        sections: prompt::parse(&prompt),
        prompt,
    }))
}

async fn load_snapshot(state: &ApiState) -> Result<ConfigSnapshot, ApiError> {
    let settings = state.settings.clone();
    spawn_blocking(move || settings.snapshot())
        .await
        .map_err(|err| ApiError::internal("settings task failed", err))?
        .map_err(|err| ApiError::internal("failed to load site settings", err))
}

async fn record_outcome(pool: &DbPool, flow: &str, outcome: &Result<NormalizedReply, GatewayError>) {
    match outcome {
        Ok(reply) => record_success(pool, flow, reply.provider, &reply.text).await,
        Err(err) => record_failure(pool, flow, err).await,
    }
}

async fn record_success(pool: &DbPool, flow: &str, provider: ProviderKind, text: &str) {
    let data = json!({
        "flow": flow,
        "provider": provider.id(),
        "preview": text.chars().take(200).collect::<String>(),
    });
    write_event(
        pool,
        "info",
        "AI-0200",
        format!("AI {flow} invocation succeeded"),
        None,
        data,
    )
    .await;
}

async fn record_failure(pool: &DbPool, flow: &str, err: &GatewayError) {
    // Rejected input is the caller's mistake, not a provider problem.
    let level = match err {
        GatewayError::InputInvalid(_) => "info",
        _ => "warn",
    };
    let data = match err {
        GatewayError::AllProvidersFailed { attempted } => json!({
            "flow": flow,
            "attempted": attempted.iter().map(|k| k.id()).collect::<Vec<_>>(),
        }),
        GatewayError::ProviderCallFailed { provider } => json!({
            "flow": flow,
            "attempted": [provider.id()],
        }),
        _ => json!({ "flow": flow }),
    };
    write_event(pool, level, err.code(), err.to_string(), Some(err.explain()), data).await;
}

async fn write_event(
    pool: &DbPool,
    level: &'static str,
    code: &'static str,
    message: String,
    explain: Option<&'static str>,
    data: serde_json::Value,
) {
    let pool = pool.clone();
    let written = spawn_blocking(move || -> anyhow::Result<()> {
        let conn = pool.get()?;
        log_event(&conn, level, Some(code), "ai.runtime", &message, explain, Some(data))?;
        Ok(())
    })
    .await;
    match written {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::warn!("failed to write ai.runtime event: {err}"),
        Err(err) => log::warn!("event log task failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_log::SqliteConversationStore;
    use crate::db::memory_pool;
    use crate::logging::count_events;
    use crate::settings::{OPENAI_API_KEY, OPENAI_BASE_URL};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> ApiState {
        let db = memory_pool();
        ApiState {
            gateway: Arc::new(AiGateway::with_client(reqwest::Client::new())),
            settings: SqliteSettingsStore::new(db.clone()),
            conversations: Arc::new(SqliteConversationStore::new(db.clone())),
            db,
        }
    }

    async fn send(state: &ApiState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&state(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let state = state();
        let (status, body) = send(&state, "POST", "/api/chat", Some(json!({ "message": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        let conn = state.db.get().unwrap();
        assert_eq!(count_events(&conn, "ai.runtime", None).unwrap(), 1);
        assert_eq!(count_events(&conn, "ai.runtime", Some("AI-1004")).unwrap(), 1);
    }

    #[tokio::test]
    async fn non_string_message_is_bad_request() {
        let (status, body) = send(&state(), "POST", "/api/chat", Some(json!({ "message": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn unconfigured_chat_is_service_unavailable() {
        let state = state();
        let (status, body) = send(
            &state,
            "POST",
            "/api/chat",
            Some(json!({ "message": "hello", "conversationHistory": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
        let conn = state.db.get().unwrap();
        assert_eq!(count_events(&conn, "ai.runtime", Some("AI-1001")).unwrap(), 1);
    }

    #[tokio::test]
    async fn chat_returns_stripped_reply_and_logs_exchange() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"We love **motion** design."}}]}"#)
            .create_async()
            .await;

        let state = state();
        state.settings.save(OPENAI_API_KEY, "sk-test").unwrap();
        state.settings.save(OPENAI_BASE_URL, &server.url()).unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/api/chat",
            Some(json!({
                "message": "Do you animate?",
                "conversationHistory": [
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "Hello!" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "We love motion design." }));

        let conn = state.db.get().unwrap();
        let logged: i64 = conn
            .query_row("SELECT COUNT(1) FROM chat_messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(logged, 2);
        assert_eq!(count_events(&conn, "ai.runtime", Some("AI-0200")).unwrap(), 1);
    }

    #[tokio::test]
    async fn failing_only_provider_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let state = state();
        state.settings.save(OPENAI_API_KEY, "sk-test").unwrap();
        state.settings.save(OPENAI_BASE_URL, &server.url()).unwrap();

        let (status, body) = send(&state, "POST", "/api/chat", Some(json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("no fallback provider"));
    }

    #[tokio::test]
    async fn enhance_without_primary_is_service_unavailable() {
        let state = state();
        state.settings.save("anthropic_api_key", "ak-test").unwrap();
        let (status, _) = send(
            &state,
            "POST",
            "/api/prompt/enhance",
            Some(json!({ "prompt": "## Role\nhelp" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn saved_sections_round_trip_through_get() {
        let state = state();
        let (status, body) = send(
            &state,
            "PUT",
            "/api/prompt",
            Some(json!({ "sections": [
                { "name": "Role", "content": "You guide visitors." },
                { "name": "", "content": "Keep it short." }
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["prompt"],
            "## Role\n\nYou guide visitors.\n\n## Section 2\n\nKeep it short."
        );

        let (status, body) = send(&state, "GET", "/api/prompt", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sections"].as_array().unwrap().len(), 2);
        assert_eq!(body["sections"][0]["name"], "Role");
        let conn = state.db.get().unwrap();
        assert_eq!(count_events(&conn, "ai.settings", None).unwrap(), 1);
    }

    #[tokio::test]
    async fn saving_no_sections_is_rejected() {
        let (status, _) = send(&state(), "PUT", "/api/prompt", Some(json!({ "sections": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_prompt_reads_as_default_section() {
        let (_, body) = send(&state(), "GET", "/api/prompt", None).await;
        assert_eq!(body["prompt"], "");
        assert_eq!(body["sections"][0]["name"], "Section 1");
    }

    #[tokio::test]
    async fn successful_enhancement_is_logged() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r###"{"choices":[{"message":{"content":"## Role\nGuide visitors.\n\n## Tone\nWarm."}}]}"###)
            .create_async()
            .await;

        let state = state();
        state.settings.save(OPENAI_API_KEY, "sk-test").unwrap();
        state.settings.save(OPENAI_BASE_URL, &server.url()).unwrap();

        let (status, body) = send(
            &state,
            "POST",
            "/api/prompt/enhance",
            Some(json!({ "prompt": "## Role\nhelp" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sections"].as_array().unwrap().len(), 2);

        let conn = state.db.get().unwrap();
        assert_eq!(count_events(&conn, "ai.runtime", Some("AI-0200")).unwrap(), 1);
        let flow: String = conn
            .query_row(
                "SELECT json_extract(data, '$.flow') FROM event_log WHERE code = 'AI-0200'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(flow, "enhance");
    }
}
