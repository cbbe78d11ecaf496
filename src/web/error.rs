//! Error taxonomy shared by every gateway handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    documents::DocumentError,
    web::{ApiMessage, uploads::UploadError},
};

pub const UNSUPPORTED_FORMAT_MESSAGE: &str = "Unsupported file format. Use PDF or DOCX.";
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to extract text from the document.";
pub const STORAGE_FAILURE_MESSAGE: &str = "Failed to store the uploaded file.";
pub const MALFORMED_FLASHCARDS_MESSAGE: &str =
    "Failed to parse flashcards response. Ensure the format is valid JSON.";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required request field is missing or empty.
    #[error("{0}")]
    Validation(String),

    #[error("unsupported file extension `{0}`")]
    UnsupportedFormat(String),

    #[error("{0}")]
    NotFound(String),

    /// Document text extraction failed.
    #[error("document parse failed: {0}")]
    Parse(String),

    /// The upload could not be parked on local disk.
    #[error("upload storage failed: {0}")]
    Storage(#[source] UploadError),

    /// The upstream provider call failed; `message` is what the client sees.
    #[error("{message}: {cause:#}")]
    Upstream {
        message: &'static str,
        cause: anyhow::Error,
    },

    /// The model answered, but not with the structure we asked for.
    #[error("malformed generation")]
    MalformedGeneration { message: &'static str, raw: String },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(message: &'static str, cause: anyhow::Error) -> Self {
        Self::Upstream { message, cause }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Parse(_)
            | GatewayError::Storage(_)
            | GatewayError::Upstream { .. }
            | GatewayError::MalformedGeneration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ApiMessage {
        match self {
            GatewayError::Validation(message) | GatewayError::NotFound(message) => {
                ApiMessage::new(message.clone())
            }
            GatewayError::UnsupportedFormat(_) => ApiMessage::new(UNSUPPORTED_FORMAT_MESSAGE),
            GatewayError::Parse(_) => ApiMessage::new(PARSE_FAILURE_MESSAGE),
            GatewayError::Storage(_) => ApiMessage::new(STORAGE_FAILURE_MESSAGE),
            GatewayError::Upstream { message, .. } => ApiMessage::new(*message),
            GatewayError::MalformedGeneration { message, raw } => {
                ApiMessage::new(*message).with_raw(raw.clone())
            }
        }
    }
}

impl From<DocumentError> for GatewayError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::UnsupportedFormat(ext) => GatewayError::UnsupportedFormat(ext),
            other => GatewayError::Parse(other.to_string()),
        }
    }
}

impl From<UploadError> for GatewayError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Form(message) => GatewayError::Validation(message),
            storage @ UploadError::Storage { .. } => GatewayError::Storage(storage),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
