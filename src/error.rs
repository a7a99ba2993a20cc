//! Error types for medrelay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for medrelay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for medrelay.
///
/// The `Display` text is what callers see in the `{"error": ...}` body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required inbound field was empty or missing.
    #[error("{0}")]
    Validation(String),

    /// The inbound body could not be read as the expected JSON shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Bearer token could not be obtained.
    #[error("Token request failed: {0}")]
    Auth(String),

    /// Network failure, non-2xx status, or unreadable body from watsonx.ai.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// A successful upstream response lacked the expected field.
    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::InvalidBody(_)
            | Error::Auth(_)
            | Error::Upstream(_)
            | Error::ResponseShape(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });

        (status, axum::Json(body)).into_response()
    }
}
