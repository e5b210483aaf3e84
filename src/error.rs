// ⚠️ Error Taxonomy
// Every extraction failure collapses to one user-facing message

use thiserror::Error;

/// The only message shown to users, whatever went wrong.
pub const USER_FACING_MESSAGE: &str = "Failed to analyze the receipt. Please try another image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    ShapeMismatch,
    Parse,
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::ShapeMismatch => "ShapeMismatch",
            ErrorKind::Parse => "ParseError",
        }
    }
}

/// Extraction failure
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Missing or unusable credentials. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON present but required fields missing or mistyped
    #[error("Response does not match the receipt schema: {0}")]
    ShapeMismatch(String),

    #[error("Response is not valid JSON: {0}")]
    Parse(String),
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Configuration(_) => ErrorKind::Configuration,
            ExtractionError::Transport(_) => ErrorKind::Transport,
            ExtractionError::ShapeMismatch(_) => ErrorKind::ShapeMismatch,
            ExtractionError::Parse(_) => ErrorKind::Parse,
        }
    }

    pub fn user_message(&self) -> &'static str {
        USER_FACING_MESSAGE
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        ExtractionError::Transport(err.to_string())
    }
}

// ============================================================================
// HTTP BOUNDARY
// ============================================================================

/// Handler error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Extraction failed (500)
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[cfg(feature = "server")]
mod response {
    use super::{ApiError, USER_FACING_MESSAGE};
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use serde_json::json;

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let (status, error, detail) = match self {
                ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg),
                ApiError::Extraction(ref err) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    USER_FACING_MESSAGE,
                    err.to_string(),
                ),
            };

            (status, Json(json!({ "error": error, "detail": detail }))).into_response()
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ExtractionError::Configuration("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(ExtractionError::Transport("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(ExtractionError::ShapeMismatch("x".into()).kind(), ErrorKind::ShapeMismatch);
        assert_eq!(ExtractionError::Parse("x".into()).kind(), ErrorKind::Parse);
        assert_eq!(ErrorKind::Parse.name(), "ParseError");
    }

    #[test]
    fn test_user_message_is_the_same_for_every_kind() {
        let errors = [
            ExtractionError::Configuration("no key".into()),
            ExtractionError::Transport("connection refused".into()),
            ExtractionError::ShapeMismatch("total".into()),
            ExtractionError::Parse("eof".into()),
        ];

        for err in &errors {
            assert_eq!(err.user_message(), USER_FACING_MESSAGE);
        }
    }

    #[test]
    fn test_api_error_wraps_extraction_error() {
        let api: ApiError = ExtractionError::Parse("bad".into()).into();
        assert_eq!(api.to_string(), "Response is not valid JSON: bad");
    }
}
