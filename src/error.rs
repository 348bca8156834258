use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{error, warn};

/// Crate-wide error type.
///
/// Two families share this enum: expected, recoverable conditions
/// (`Query`, `InvalidCredentials`, `InactiveAccount`, `Invalid`) that the
/// route layer translates into friendly messages, and infrastructure
/// failures (`Connection`, `Transaction`) that are fatal to the request.
#[derive(Debug, ThisError)]
pub enum ViharaError {
    /// The backing store is unreachable. Fatal per request, not retried.
    #[error("database connection error: {0}")]
    Connection(String),

    /// Malformed query, unknown column, or constraint violation surfaced by
    /// the engine. Callers pre-validate where a friendly message matters.
    #[error("query error: {0}")]
    Query(String),

    /// Misuse of transaction scoping. A programming error, never a
    /// user-facing condition, but it must fail loudly.
    #[error("transaction misuse: {0}")]
    Transaction(&'static str),

    /// Lookup failure and hash mismatch collapse into this one variant so a
    /// caller cannot learn which field was wrong.
    #[error("Invalid login credentials.")]
    InvalidCredentials,

    #[error("Your account has been deactivated.")]
    InactiveAccount,

    /// Missing session or role mismatch. Terminal for the request.
    #[error("forbidden")]
    Forbidden,

    /// Route-level field validation message, shown to the user as-is.
    #[error("{0}")]
    Invalid(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SqlxError> for ViharaError {
    fn from(e: SqlxError) -> Self {
        match e {
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Protocol(_)
            | SqlxError::Configuration(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => ViharaError::Connection(e.to_string()),
            other => ViharaError::Query(other.to_string()),
        }
    }
}

impl IntoResponse for ViharaError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match &self {
            ViharaError::Connection(detail) => {
                error!(detail = %detail, "database unreachable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal error occurred. Please try again later."
                            .to_string(),
                    },
                )
            }
            ViharaError::Transaction(detail) => {
                error!(detail = %detail, "transaction scope misuse");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal error occurred. Please try again later."
                            .to_string(),
                    },
                )
            }
            ViharaError::Json(e) => {
                error!(error = %e, "serialization failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal error occurred. Please try again later."
                            .to_string(),
                    },
                )
            }
            ViharaError::Query(detail) => {
                warn!(detail = %detail, "query rejected");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ApiErrorBody {
                        code: "QUERY_REJECTED".to_string(),
                        message: "The record could not be saved.".to_string(),
                    },
                )
            }
            ViharaError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message: self.to_string(),
                },
            ),
            ViharaError::InactiveAccount => (
                StatusCode::FORBIDDEN,
                ApiErrorBody {
                    code: "ACCOUNT_INACTIVE".to_string(),
                    message: self.to_string(),
                },
            ),
            ViharaError::Forbidden => (
                StatusCode::FORBIDDEN,
                ApiErrorBody {
                    code: "FORBIDDEN".to_string(),
                    message: "You do not have permission to access this resource."
                        .to_string(),
                },
            ),
            ViharaError::Invalid(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorBody {
                    code: "VALIDATION".to_string(),
                    message: message.clone(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
