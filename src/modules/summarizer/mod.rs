use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    AppState,
    documents::{self, MAX_SUMMARY_CHARS},
    llm::{ChatMessage, LlmRequest},
    web::{
        GatewayError,
        uploads::{TempUpload, receive_single_file},
    },
};

const FILE_FIELD: &str = "file";
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes documents in Markdown format.";
const USER_PROMPT_PREFIX: &str = "Please summarize the following content in Markdown format:\n\n";
const SUMMARY_TEMPERATURE: f32 = 0.5;
const NO_FILE: &str = "No file uploaded.";
const UPSTREAM_FAILURE: &str = "Failed to summarize the file.";

pub fn router() -> Router<AppState> {
    Router::new().route("/summarize", post(summarize))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub markdown_summary: String,
}

async fn summarize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, GatewayError> {
    // A body that is not multipart cannot carry a file.
    let multipart = multipart.map_err(|_| GatewayError::validation(NO_FILE))?;
    let upload = receive_single_file(multipart, &state.settings().upload_dir, FILE_FIELD)
        .await?
        .ok_or_else(|| GatewayError::validation(NO_FILE))?;

    info!(
        file = %upload.original_name,
        extension = %upload.extension,
        bytes = upload.file_size,
        "received document for summarization"
    );

    let outcome = summarize_upload(&state, &upload).await;
    upload.discard().await;
    outcome.map(Json)
}

async fn summarize_upload(
    state: &AppState,
    upload: &TempUpload,
) -> Result<SummaryResponse, GatewayError> {
    let text = documents::extract_text(upload.path(), &upload.original_name).await?;
    let extracted_chars = text.chars().count();
    let text = documents::truncate(&text, MAX_SUMMARY_CHARS);
    if extracted_chars > MAX_SUMMARY_CHARS {
        warn!(
            file = %upload.original_name,
            extracted_chars,
            kept_chars = MAX_SUMMARY_CHARS,
            "truncated document text before summarization"
        );
    }

    let request = build_summary_request(&state.models().summary, text);
    let response = state
        .completion_model()
        .complete(request)
        .await
        .map_err(|err| GatewayError::upstream(UPSTREAM_FAILURE, err))?;

    info!(
        provider = %response.provider,
        model = %response.model,
        total_tokens = response.token_usage.total_tokens,
        "document summarized"
    );

    Ok(SummaryResponse {
        markdown_summary: response.text,
    })
}

fn build_summary_request(model: &str, text: &str) -> LlmRequest {
    LlmRequest::new(
        model,
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("{USER_PROMPT_PREFIX}{text}")),
        ],
    )
    .with_temperature(SUMMARY_TEMPERATURE)
}
