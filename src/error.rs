//! # Error Handling
//!
//! HTTP-facing error type and the conversions into it from the domain errors
//! (`GenAiError`, `FeedbackError`, `DecodeError`, `TutorError`).
//!
//! ## Key Rust Concepts for Error Handling:
//! - **From trait**: Lets handlers use `?` on domain results and get an `AppError`
//! - **ResponseError trait**: Turns an `AppError` into an HTTP response
//! - **Display trait**: Defines how errors are formatted as strings
//!
//! ## Mapping rules:
//! - Learner input problems → 400
//! - Unknown lesson or media id → 404
//! - A round already in flight → 409
//! - Service rejected the credential → 401 with type `credential_reselect`,
//!   which tells the browser to prompt for a new key
//! - Video job exceeded its wait → 504
//! - Any other service failure or invalid service output → 502

use crate::audio::DecodeError;
use crate::genai::GenAiError;
use crate::lesson::evaluation::FeedbackError;
use crate::lesson::TutorError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Internal**: Server-side problems (500)
/// - **BadRequest**: Client sent invalid data (400)
/// - **NotFound**: Requested resource doesn't exist (404)
/// - **ConfigError**: Configuration problems (500)
/// - **ValidationError**: Data validation failed (400)
/// - **Conflict**: Another generation chain is running (409)
/// - **Upstream**: The generative service failed or answered with garbage (502)
/// - **CredentialRejected**: The service refused the API key (401)
/// - **Timeout**: A long-running job did not finish in time (504)
#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
    NotFound(String),
    ConfigError(String),
    ValidationError(String),
    Conflict(String),
    Upstream(String),
    CredentialRejected(String),
    Timeout(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            AppError::CredentialRejected(msg) => write!(f, "Credential rejected: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl AppError {
    /// Status code and machine-readable type for each variant.
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            AppError::CredentialRejected(msg) => (StatusCode::UNAUTHORIZED, "credential_reselect", msg),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", msg),
        }
    }
}

/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "credential_reselect",
///     "message": "Requested entity was not found.",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = self.parts();

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Malformed request bodies are the client's fault, so 400 rather than 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<GenAiError> for AppError {
    fn from(err: GenAiError) -> Self {
        if err.is_credential_rejection() {
            return AppError::CredentialRejected(match err {
                GenAiError::Api { message, .. } => message,
                other => other.to_string(),
            });
        }
        match err {
            GenAiError::PollTimeout(_) => AppError::Timeout(err.to_string()),
            GenAiError::Cancelled => AppError::Internal(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        AppError::Upstream(format!("Evaluation response was invalid: {}", err))
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Upstream(format!("Speech audio could not be decoded: {}", err))
    }
}

impl From<TutorError> for AppError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::GenAi(e) => e.into(),
            TutorError::Feedback(e) => e.into(),
            TutorError::Decode(e) => e.into(),
            TutorError::LessonNotFound(_) => AppError::NotFound(err.to_string()),
            TutorError::EmptyText(_) => AppError::ValidationError(err.to_string()),
            TutorError::Busy => AppError::Conflict(err.to_string()),
            TutorError::AudioClosed | TutorError::Worker(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_credential_rejections_ask_for_reselection() {
        let not_found: AppError = GenAiError::Api {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        }
        .into();
        assert!(matches!(&not_found, AppError::CredentialRejected(msg) if msg == "Requested entity was not found."));
        assert_eq!(not_found.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden: AppError = GenAiError::Api { status: 403, message: "denied".to_string() }.into();
        assert!(matches!(forbidden, AppError::CredentialRejected(_)));
    }

    #[test]
    fn test_service_failures_map_to_gateway_codes() {
        let server: AppError = GenAiError::Api { status: 500, message: "boom".to_string() }.into();
        assert_eq!(server.status_code(), StatusCode::BAD_GATEWAY);

        let timeout: AppError = GenAiError::PollTimeout(Duration::from_secs(600)).into();
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let feedback: AppError = FeedbackError::MissingField("score".to_string()).into();
        assert_eq!(feedback.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_tutor_errors() {
        assert_eq!(AppError::from(TutorError::Busy).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(TutorError::LessonNotFound(uuid::Uuid::nil())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(TutorError::EmptyText("Topic")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
