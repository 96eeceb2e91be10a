//! JSON error bodies and the mapping from handler errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::SubscriptionError;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. `SUBSCRIPTION_NOT_FOUND`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Wire code for an `ErrorCode`.
pub fn wire_code(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::ValidationFailed => "VALIDATION_FAILED",
        ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
        ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
        ErrorCode::SubscriptionExists => "SUBSCRIPTION_EXISTS",
        ErrorCode::SubscriptionInactive => "SUBSCRIPTION_INACTIVE",
        ErrorCode::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        ErrorCode::UnknownTier => "UNKNOWN_TIER",
        ErrorCode::UnknownFeature => "UNKNOWN_FEATURE",
        ErrorCode::Unauthorized => "OWNER_REQUIRED",
        ErrorCode::DatabaseError | ErrorCode::InternalError => "INTERNAL_ERROR",
    }
}

/// API error type that converts handler errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub SubscriptionError);

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(SubscriptionError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Storage details stay in the logs.
        let message = match &self.0 {
            SubscriptionError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "request failed");
                "An internal error occurred".to_string()
            }
            other => other.message(),
        };

        let body = match &self.0 {
            SubscriptionError::ValidationFailed { field, .. } => ErrorResponse::with_details(
                wire_code(self.0.code()),
                message,
                serde_json::json!({ "field": field }),
            ),
            _ => ErrorResponse::new(wire_code(self.0.code()), message),
        };
        (status, Json(body)).into_response()
    }
}
