use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to turn an uploaded or pasted source into usable text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Could not decode the text file with any supported encoding")]
    Encoding,

    #[error("No text could be extracted from the {0} file. It might contain only images or be password protected.")]
    EmptyContent(&'static str),

    #[error("Please provide more content (at least {min} characters, got {actual}) to generate meaningful questions.")]
    TooShort { min: usize, actual: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error reading {format} file: {cause}")]
    Malformed { format: &'static str, cause: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteGenerationError {
    #[error("Remote generation is not configured (no API credential)")]
    NotConfigured,

    #[error("Remote generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse remote response: {0}")]
    MalformedResponse(String),

    #[error("Remote response contained no questions")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Question {0} not found")]
    QuestionNotFound(Uuid),

    #[error("Question {id} is invalid: {reason}")]
    InvalidQuestion { id: Uuid, reason: String },

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    RemoteGeneration(#[from] RemoteGenerationError),

    #[error("{0}")]
    InsufficientContent(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Excel export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let question_id = match &self {
            Error::QuestionNotFound(id) | Error::InvalidQuestion { id, .. } => Some(*id),
            _ => None,
        };

        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            err @ Error::QuestionNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            Error::InvalidQuestion { reason, .. } => (StatusCode::UNPROCESSABLE_ENTITY, reason),
            Error::Extraction(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Error::InsufficientContent(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::RemoteGeneration(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Error::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Multipart(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Export(msg) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Export error: {}", msg)),
            Error::Xlsx(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Export error: {}", err)),
            Error::Anyhow(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = match question_id {
            Some(id) => Json(json!({ "error": error_message, "question_id": id })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}
