//! Axum router configuration for entitlement endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    check_capacity, check_feature, get_entitlements, list_tiers, release_capacity,
    reserve_capacity,
};
use crate::adapters::http::AppState;

/// Create the entitlement API router.
///
/// # Routes
///
/// ## Owner Endpoints (require `X-Owner-Id`)
/// - `GET /` - All features and limits for the owner
/// - `GET /features/:feature` - Check one feature
/// - `GET /capacity/:resource` - Check one capacity limit
/// - `POST /capacity/:resource/reserve` - Take one unit if under the cap
/// - `POST /capacity/:resource/release` - Give one unit back
///
/// ## Public Endpoints
/// - `GET /tiers` - Tier catalogue in rank order
pub fn entitlement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_entitlements))
        .route("/features/:feature", get(check_feature))
        .route("/capacity/:resource", get(check_capacity))
        .route("/capacity/:resource/reserve", post(reserve_capacity))
        .route("/capacity/:resource/release", post(release_capacity))
        .route("/tiers", get(list_tiers))
}
