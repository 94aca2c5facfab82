//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use ebill_core::BillingError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing, malformed or unknown session token.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid session but insufficient capabilities.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - duplicate resource or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Temporarily unable to serve the request.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                msg.clone(),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::PermissionDenied { reason } => Self::Forbidden(reason),
            BillingError::NotFound { .. } => Self::NotFound(err.to_string()),
            BillingError::InvalidFormat { .. } => Self::BadRequest(err.to_string()),
            BillingError::Conflict(msg) => Self::Conflict(msg),
            BillingError::InvalidToken => Self::Unauthorized,
            BillingError::TokenExhausted { .. } => Self::Unavailable(err.to_string()),
            BillingError::Persistence(msg) => Self::Internal(msg),
        }
    }
}

impl From<ebill_store::StoreError> for ApiError {
    fn from(err: ebill_store::StoreError) -> Self {
        BillingError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_statuses() {
        let cases = [
            (BillingError::denied("cashier capability required"), StatusCode::FORBIDDEN),
            (BillingError::not_found("user", "ghost"), StatusCode::NOT_FOUND),
            (BillingError::invalid_format("amount", "abc"), StatusCode::BAD_REQUEST),
            (BillingError::Conflict("plan in use".into()), StatusCode::CONFLICT),
            (BillingError::InvalidToken, StatusCode::UNAUTHORIZED),
            (
                BillingError::TokenExhausted { attempts: 8 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                BillingError::Persistence("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
