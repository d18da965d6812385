//! Health-assistant chat backed by the generative AI service.

use crate::api::{
    genai,
    handlers::auth::{require_auth, AuthState},
};
use crate::cli::globals::GlobalArgs;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

const SYSTEM_PROMPT: &str = "You are a helpful health and fitness assistant. Provide concise, \
    friendly advice about nutrition, exercise, wellness, and healthy habits. \
    Keep responses brief and actionable. Be encouraging and supportive.";

// Older turns are dropped to keep the prompt bounded.
const HISTORY_WINDOW: usize = 10;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChatTurn {
    role: String,
    content: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ChatResponse {
    pub response: String,
}

fn build_prompt(request: &ChatRequest) -> String {
    let mut conversation = Vec::new();

    let start = request.history.len().saturating_sub(HISTORY_WINDOW);
    for turn in &request.history[start..] {
        match turn.role.as_str() {
            "user" => conversation.push(format!("User: {}", turn.content)),
            "assistant" => conversation.push(format!("Assistant: {}", turn.content)),
            _ => (),
        }
    }

    conversation.push(format!("User: {}", request.message));

    format!(
        "{SYSTEM_PROMPT}\n\n{}\n\nAssistant:",
        conversation.join("\n")
    )
}

#[utoipa::path(
    post,
    path = "/chat/message",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Missing message"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "AI service not configured or unavailable"),
    ),
    tag = "chat"
)]
#[instrument(skip(headers, pool, auth, globals, payload))]
pub async fn message(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<ChatRequest>>,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&headers, &pool, &auth).await {
        return e.into_response();
    }

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing message".to_string()).into_response();
    }

    if !genai::is_configured(&globals) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "AI service not configured".to_string(),
        )
            .into_response();
    }

    let prompt = build_prompt(&request);

    match genai::generate_text(&globals, &prompt).await {
        Ok(response) => (StatusCode::OK, Json(ChatResponse { response })).into_response(),
        Err(e) => {
            error!("Chat failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Chat failed: {e}"),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_prompt_includes_system_and_message() {
        let request = ChatRequest {
            message: "How much water should I drink?".to_string(),
            history: Vec::new(),
        };

        let prompt = build_prompt(&request);
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("User: How much water should I drink?"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn test_prompt_keeps_only_recent_history() {
        let mut history = Vec::new();
        for index in 0..15 {
            history.push(turn("user", &format!("question {index}")));
        }

        let request = ChatRequest {
            message: "latest".to_string(),
            history,
        };

        let prompt = build_prompt(&request);
        assert!(!prompt.contains("question 4"));
        assert!(prompt.contains("question 5"));
        assert!(prompt.contains("question 14"));
    }

    #[test]
    fn test_prompt_skips_unknown_roles() {
        let request = ChatRequest {
            message: "hi".to_string(),
            history: vec![
                turn("user", "hello"),
                turn("system", "ignore me"),
                turn("assistant", "hi there"),
            ],
        };

        let prompt = build_prompt(&request);
        assert!(prompt.contains("User: hello"));
        assert!(prompt.contains("Assistant: hi there"));
        assert!(!prompt.contains("ignore me"));
    }
}
