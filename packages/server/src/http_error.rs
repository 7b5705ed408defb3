//! HTTP error handling
//!
//! Every handler error leaves the server as `{ "error": string }` with one
//! of these statuses:
//!
//! - 401 authentication failure
//! - 400 user input (missing field, unset API key, unknown action or type)
//! - 404 missing or foreign resource
//! - provider status passthrough for upstream failures
//! - 500 configuration errors, response contract violations and internal
//!   failures (internal details are logged, never returned)

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use mindgrid_core::ai::AiError;
use mindgrid_core::ServiceError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse AI response";
pub const CONFIGURATION_ERROR_MESSAGE: &str = "Server configuration error";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    /// User-facing error message
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Flat 500; `detail` is logged only
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<AiError> for HttpError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Upstream { status, message } => {
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                HttpError::new(status, message)
            }
            AiError::ContractViolation(detail) => {
                error!(error = %detail, "provider response did not match the expected shape");
                HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, PARSE_ERROR_MESSAGE)
            }
            AiError::Network(_) | AiError::Timeout => HttpError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to reach the AI provider",
            ),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => HttpError::bad_request(message),
            ServiceError::Validation(e) => HttpError::bad_request(e.to_string()),
            ServiceError::ApiKeyNotSet => {
                HttpError::bad_request(ServiceError::ApiKeyNotSet.to_string())
            }
            ServiceError::NotFound { resource, .. } => {
                HttpError::not_found(format!("{} not found", resource))
            }
            ServiceError::Configuration(detail) => {
                error!(error = %detail, "configuration error");
                HttpError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CONFIGURATION_ERROR_MESSAGE,
                )
            }
            ServiceError::Ai(e) => e.into(),
            ServiceError::Database(e) => HttpError::internal(e),
            ServiceError::Storage(e) => HttpError::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindgrid_core::db::DatabaseError;

    #[test]
    fn test_upstream_status_passes_through() {
        let err: HttpError = AiError::Upstream {
            status: 429,
            message: "Rate limit reached".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.message, "Rate limit reached");

        let err: HttpError = AiError::Upstream {
            status: 200,
            message: "odd".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err: HttpError =
            ServiceError::Database(DatabaseError::sql_execution("disk I/O error at page 7")).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_contract_violation_is_parse_error() {
        let err: HttpError = ServiceError::Ai(AiError::contract("missing suggestions")).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, PARSE_ERROR_MESSAGE);
    }

    #[test]
    fn test_unset_key_is_bad_request() {
        let err: HttpError = ServiceError::ApiKeyNotSet.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("API key not configured"));
    }
}
