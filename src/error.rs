//! Error type shared by the dispatcher, the stream parser and the editors.
//!
//! Every failure the workbench can hit is user-visible, so each variant
//! carries a message suitable for an inline error block.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout, body read failure.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Provider answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// User-supplied text (pasted JSON, DSL, workflow) could not be used.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Response arrived but does not have the expected TRAPI shape.
    #[error("Unexpected response: {0}")]
    ResponseShape(String),

    /// Progress stream could not be decoded.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Provider URL rejected by the URL guard.
    #[error("Provider URL rejected: {0}")]
    ProviderUrl(#[from] crate::url_validator::UrlValidationError),
}

impl ClientError {
    /// Short label used for the error block heading.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "transport",
            ClientError::HttpStatus { .. } => "http",
            ClientError::InvalidInput(_) => "input",
            ClientError::ResponseShape(_) => "response",
            ClientError::Stream(_) => "stream",
            ClientError::ProviderUrl(_) => "provider",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ClientError::InvalidInput(_) | ClientError::ProviderUrl(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON API errors: `{"error": ..., "kind": ...}`.
impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({"error": self.to_string(), "kind": self.kind()});
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            ClientError::HttpStatus {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
