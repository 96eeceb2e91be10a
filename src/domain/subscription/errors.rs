//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | NotFoundForOwner | 404 |
//! | AlreadyExists | 409 |
//! | InvalidState | 409 |
//! | Conflict | 409 |
//! | Inactive | 402 |
//! | UnknownTier | 400 |
//! | UnknownFeature | 400 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, SubscriptionId};

/// Errors returned by subscription command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No record with this id.
    NotFound(SubscriptionId),

    /// Owner has no current subscription.
    NotFoundForOwner(OwnerId),

    /// Owner already has a current subscription.
    AlreadyExists(OwnerId),

    /// Subscription is not in a state that permits the operation.
    Inactive(SubscriptionId),

    InvalidState {
        message: String,
    },

    /// The record changed after it was read.
    Conflict(String),

    UnknownTier(String),

    UnknownFeature(String),

    ValidationFailed {
        field: String,
        message: String,
    },

    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found(id: SubscriptionId) -> Self {
        SubscriptionError::NotFound(id)
    }

    pub fn not_found_for_owner(owner_id: OwnerId) -> Self {
        SubscriptionError::NotFoundForOwner(owner_id)
    }

    pub fn already_exists(owner_id: OwnerId) -> Self {
        SubscriptionError::AlreadyExists(owner_id)
    }

    pub fn inactive(id: SubscriptionId) -> Self {
        SubscriptionError::Inactive(id)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SubscriptionError::Conflict(message.into())
    }

    pub fn unknown_tier(tier: impl Into<String>) -> Self {
        SubscriptionError::UnknownTier(tier.into())
    }

    pub fn unknown_feature(feature: impl Into<String>) -> Self {
        SubscriptionError::UnknownFeature(feature.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFound(_) | SubscriptionError::NotFoundForOwner(_) => {
                ErrorCode::SubscriptionNotFound
            }
            SubscriptionError::AlreadyExists(_) => ErrorCode::SubscriptionExists,
            SubscriptionError::Inactive(_) => ErrorCode::SubscriptionInactive,
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::Conflict(_) => ErrorCode::ConcurrencyConflict,
            SubscriptionError::UnknownTier(_) => ErrorCode::UnknownTier,
            SubscriptionError::UnknownFeature(_) => ErrorCode::UnknownFeature,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// HTTP status code hint for the HTTP adapter.
    pub fn status_code(&self) -> u16 {
        match self {
            SubscriptionError::NotFound(_) | SubscriptionError::NotFoundForOwner(_) => 404,
            SubscriptionError::AlreadyExists(_)
            | SubscriptionError::InvalidState { .. }
            | SubscriptionError::Conflict(_) => 409,
            SubscriptionError::Inactive(_) => 402,
            SubscriptionError::UnknownTier(_)
            | SubscriptionError::UnknownFeature(_)
            | SubscriptionError::ValidationFailed { .. } => 400,
            SubscriptionError::Infrastructure(_) => 500,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::NotFound(id) => format!("Subscription not found: {}", id),
            SubscriptionError::NotFoundForOwner(owner_id) => {
                format!("No current subscription for owner: {}", owner_id)
            }
            SubscriptionError::AlreadyExists(owner_id) => {
                format!("Owner {} already has a current subscription", owner_id)
            }
            SubscriptionError::Inactive(id) => format!("Subscription {} is not active", id),
            SubscriptionError::InvalidState { message } => message.clone(),
            SubscriptionError::Conflict(message) => message.clone(),
            SubscriptionError::UnknownTier(tier) => format!("Unknown tier: {}", tier),
            SubscriptionError::UnknownFeature(feature) => format!("Unknown feature: {}", feature),
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscriptionError::Infrastructure(_))
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SubscriptionNotFound => match detail::<SubscriptionId>(&err, "subscription_id")
            {
                Some(id) => SubscriptionError::NotFound(id),
                None => SubscriptionError::Conflict(err.message),
            },
            ErrorCode::SubscriptionExists => match detail::<OwnerId>(&err, "owner_id") {
                Some(owner_id) => SubscriptionError::AlreadyExists(owner_id),
                None => SubscriptionError::Conflict(err.message),
            },
            ErrorCode::ConcurrencyConflict => SubscriptionError::Conflict(err.message),
            ErrorCode::InvalidStateTransition => SubscriptionError::InvalidState {
                message: err.message,
            },
            ErrorCode::ValidationFailed => SubscriptionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::UnknownTier => SubscriptionError::UnknownTier(err.message),
            ErrorCode::UnknownFeature => SubscriptionError::UnknownFeature(err.message),
            ErrorCode::SubscriptionInactive => SubscriptionError::InvalidState {
                message: err.message,
            },
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

fn detail<T: std::str::FromStr>(err: &DomainError, key: &str) -> Option<T> {
    err.details.get(key).and_then(|value| value.parse().ok())
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("trust-7").unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Codes and statuses
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn already_exists_is_conflict() {
        let err = SubscriptionError::already_exists(owner());
        assert_eq!(err.code(), ErrorCode::SubscriptionExists);
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn not_found_for_owner_is_404() {
        let err = SubscriptionError::not_found_for_owner(owner());
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn inactive_is_payment_required() {
        let err = SubscriptionError::inactive(SubscriptionId::new());
        assert_eq!(err.status_code(), 402);
    }

    #[test]
    fn infrastructure_is_retryable_and_500() {
        let err = SubscriptionError::infrastructure("pool timed out");
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Messages
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn already_exists_message_names_owner() {
        let err = SubscriptionError::already_exists(owner());
        assert!(err.message().contains("trust-7"));
    }

    #[test]
    fn display_matches_message() {
        let err = SubscriptionError::unknown_tier("platinum");
        assert_eq!(err.to_string(), err.message());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Conversions
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn state_transition_domain_error_becomes_invalid_state() {
        let domain = DomainError::new(ErrorCode::InvalidStateTransition, "Cannot transition");
        let err: SubscriptionError = domain.into();
        assert!(matches!(err, SubscriptionError::InvalidState { .. }));
    }

    #[test]
    fn validation_domain_error_keeps_field() {
        let domain = DomainError::validation("quantity", "must be positive");
        let err: SubscriptionError = domain.into();
        assert_eq!(
            err,
            SubscriptionError::validation("quantity", "must be positive")
        );
    }

    #[test]
    fn database_domain_error_becomes_infrastructure() {
        let err: SubscriptionError = DomainError::database("connection reset").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn repository_exists_error_becomes_already_exists() {
        let domain = DomainError::new(ErrorCode::SubscriptionExists, "taken")
            .with_detail("owner_id", "trust-7");
        let err: SubscriptionError = domain.into();
        assert_eq!(err, SubscriptionError::already_exists(owner()));
        assert_eq!(err.status_code(), 409);
        assert!(!err.is_retryable());
    }

    #[test]
    fn repository_not_found_error_becomes_not_found() {
        let id = SubscriptionId::new();
        let domain = DomainError::new(ErrorCode::SubscriptionNotFound, "gone")
            .with_detail("subscription_id", id.to_string());
        let err: SubscriptionError = domain.into();
        assert_eq!(err, SubscriptionError::not_found(id));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn concurrency_conflict_is_409_and_not_retryable() {
        let err: SubscriptionError =
            DomainError::new(ErrorCode::ConcurrencyConflict, "changed underneath").into();
        assert_eq!(err.code(), ErrorCode::ConcurrencyConflict);
        assert_eq!(err.status_code(), 409);
        assert!(!err.is_retryable());
    }

    #[test]
    fn round_trips_code_into_domain_error() {
        let domain: DomainError = SubscriptionError::already_exists(owner()).into();
        assert_eq!(domain.code, ErrorCode::SubscriptionExists);
    }
}
