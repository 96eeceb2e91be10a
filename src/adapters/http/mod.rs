//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure. Both
//! share one [`AppState`] and one JSON error shape.

pub mod entitlement;
pub mod error;
pub mod state;
pub mod subscription;

use axum::{routing::get, Json, Router};

pub use entitlement::{entitlement_routes, OwnerContext, OWNER_HEADER};
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;
pub use subscription::subscription_routes;

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Create the complete API router, mounted at the server root.
///
/// ```ignore
/// let app = api_router(state);
/// axum::serve(listener, app).await?;
/// ```
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/entitlements", entitlement_routes())
        .nest("/api/subscriptions", subscription_routes())
        .with_state(state)
}
