use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AppState,
    llm::{ChatMessage, LlmRequest},
    web::{GatewayError, json_or_default},
};

const SYSTEM_PROMPT: &str =
    "You are a teaching assistant. You need to solve students queries related to education.";
pub(crate) const MESSAGE_REQUIRED: &str = "Message is required";
const UPSTREAM_FAILURE: &str = "Failed to generate response from Gemini";

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Pull a usable message out of an optional field, rejecting empty input.
pub(crate) fn require_message(message: Option<String>) -> Result<String, GatewayError> {
    message
        .filter(|text| !text.is_empty())
        .ok_or_else(|| GatewayError::validation(MESSAGE_REQUIRED))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, GatewayError> {
    let message = require_message(json_or_default(payload).message)?;

    let request = LlmRequest::new(
        state.models().chat.clone(),
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(message)],
    );
    let response = state
        .chat_model()
        .complete(request)
        .await
        .map_err(|err| GatewayError::upstream(UPSTREAM_FAILURE, err))?;

    info!(
        provider = %response.provider,
        model = %response.model,
        total_tokens = response.token_usage.total_tokens,
        "chat reply generated"
    );

    Ok(Json(ChatReply {
        reply: response.text,
    }))
}
