use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LingoError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Translation HTTP error: {status} - {body}")]
    TranslationHttp { status: u16, body: String },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for LingoError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LingoError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            LingoError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LingoError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            LingoError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            LingoError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            LingoError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            LingoError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            LingoError::UrlParse(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            LingoError::Ocr(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            LingoError::OcrUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            LingoError::Translation(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            LingoError::TranslationHttp { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            LingoError::Render(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            LingoError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            LingoError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, LingoError>;
