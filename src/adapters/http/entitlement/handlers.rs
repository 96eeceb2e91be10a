//! HTTP handlers for entitlement endpoints.
//!
//! These handlers connect Axum routes to the entitlement query handlers.
//! A denied feature is a normal `200` answer with `granted: false`.

use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::{ApiError, ErrorResponse};
use crate::adapters::http::AppState;
use crate::application::handlers::{
    CheckCapacityQuery, CheckFeatureAccessQuery, GetEntitlementsQuery, ReleaseCapacityCommand,
    ReserveCapacityCommand,
};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{Feature, ResourceKind, SubscriptionError};

use super::dto::{
    CapacityResponse, EntitlementsResponse, FeatureAccessResponse, ReserveCapacityResponse,
    TierListResponse, TierResponse,
};

/// Header carrying the owner resolved by the identity provider.
pub const OWNER_HEADER: &str = "X-Owner-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Owner Context
// ════════════════════════════════════════════════════════════════════════════════

/// Owner whose entitlements are being asked about.
///
/// Authentication happens upstream; the gateway forwards the resolved
/// organization or user in the `X-Owner-Id` header.
#[derive(Debug, Clone)]
pub struct OwnerContext {
    pub owner_id: OwnerId,
}

/// Rejection when the owner header is missing or blank.
pub struct OwnerRequired;

impl IntoResponse for OwnerRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new(
            "OWNER_REQUIRED",
            format!("The {} header is required", OWNER_HEADER),
        );
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = OwnerRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner_id = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| OwnerId::new(s).ok())
            .ok_or(OwnerRequired)?;

        Ok(OwnerContext { owner_id })
    }
}

fn parse_feature(raw: &str) -> Result<Feature, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(SubscriptionError::unknown_feature(raw)))
}

fn parse_resource(raw: &str) -> Result<ResourceKind, ApiError> {
    raw.parse().map_err(|_| {
        ApiError(SubscriptionError::validation(
            "resource",
            format!("Unknown resource '{}'", raw),
        ))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/entitlements - Everything the owner may use
pub async fn get_entitlements(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .get_entitlements_handler()
        .handle(GetEntitlementsQuery {
            owner_id: owner.owner_id.clone(),
        })
        .await;

    Ok(Json(EntitlementsResponse::new(&owner.owner_id, summary)))
}

/// GET /api/entitlements/features/:feature - Check one feature
pub async fn check_feature(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(feature): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let feature = parse_feature(&feature)?;
    let result = state
        .check_feature_access_handler()
        .handle(CheckFeatureAccessQuery {
            owner_id: owner.owner_id.clone(),
            feature,
        })
        .await;

    Ok(Json(FeatureAccessResponse::new(
        &owner.owner_id,
        feature,
        result,
    )))
}

/// GET /api/entitlements/capacity/:resource - Check one capacity limit
pub async fn check_capacity(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = parse_resource(&resource)?;
    let result = state
        .check_capacity_handler()
        .handle(CheckCapacityQuery {
            owner_id: owner.owner_id.clone(),
            resource,
        })
        .await;

    Ok(Json(CapacityResponse::from_result(&owner.owner_id, result)))
}

/// GET /api/entitlements/tiers - The catalogue in rank order
pub async fn list_tiers(State(state): State<AppState>) -> impl IntoResponse {
    let tiers = state
        .resolver
        .catalogue()
        .tiers_by_rank()
        .into_iter()
        .map(TierResponse::from)
        .collect();

    Json(TierListResponse { tiers })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/entitlements/capacity/:resource/reserve - Take one unit if under the cap
pub async fn reserve_capacity(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = parse_resource(&resource)?;
    let result = state
        .reserve_capacity_handler()
        .handle(ReserveCapacityCommand {
            owner_id: owner.owner_id.clone(),
            resource,
        })
        .await?;

    let status = if result.reserved {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(ReserveCapacityResponse::new(&owner.owner_id, result))))
}

/// POST /api/entitlements/capacity/:resource/release - Give one unit back
pub async fn release_capacity(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = parse_resource(&resource)?;
    state
        .release_capacity_handler()
        .handle(ReleaseCapacityCommand {
            owner_id: owner.owner_id,
            resource,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::{InMemoryCapacityUsageStore, InMemorySubscriptionRepository};
    use crate::domain::entitlement::{EntitlementResolver, TierCatalogue};
    use crate::domain::foundation::{SubscriptionId, Timestamp};
    use crate::domain::subscription::{BillingCycle, PaidTerms, Subscription, Tier};
    use crate::ports::SubscriptionRepository;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn owner() -> OwnerContext {
        OwnerContext {
            owner_id: OwnerId::new("school-21").unwrap(),
        }
    }

    async fn test_state(tier: Option<Tier>) -> AppState {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        if let Some(tier) = tier {
            let sub = Subscription::start_paid(
                SubscriptionId::new(),
                owner().owner_id,
                tier,
                BillingCycle::Annually,
                PaidTerms::default(),
                Timestamp::now(),
            )
            .unwrap();
            repo.save(&sub).await.unwrap();
        }
        AppState::new(
            repo,
            Arc::new(InMemoryCapacityUsageStore::new()),
            EntitlementResolver::new(Arc::new(TierCatalogue::builtin().unwrap())),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Handler Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn check_feature_answers_known_feature() {
        let state = test_state(Some(Tier::SchoolSmall)).await;
        let result = check_feature(State(state), owner(), Path("battle_royale".to_string())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn check_feature_rejects_unknown_feature() {
        let state = test_state(Some(Tier::SchoolSmall)).await;
        let result = check_feature(State(state), owner(), Path("teleport".to_string())).await;
        let err = result.err().unwrap();
        assert!(matches!(err.0, SubscriptionError::UnknownFeature(_)));
    }

    #[tokio::test]
    async fn check_capacity_rejects_unknown_resource() {
        let state = test_state(None).await;
        let result = check_capacity(State(state), owner(), Path("teachers".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reserve_without_plan_is_not_found() {
        let state = test_state(None).await;
        let err = reserve_capacity(State(state), owner(), Path("students".to_string()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0.status_code(), 404);
    }

    #[test]
    fn missing_owner_is_unauthorized() {
        assert_eq!(
            OwnerRequired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
