//! Axum router configuration for subscription lifecycle endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    apply_billing_event, change_plan, get_subscription, list_subscriptions, renew_subscription,
    set_auto_renew, start_subscription,
};
use crate::adapters::http::AppState;

/// Create the subscription API router.
///
/// # Routes
/// - `GET /` - Filtered, paginated history
/// - `POST /` - Start a trial or paid plan
/// - `POST /change-plan` - Supersede the owner's current plan
/// - `GET /:id` - One record
/// - `POST /:id/events` - Apply a billing lifecycle event
/// - `POST /:id/renew` - Extend by one billing period
/// - `PUT /:id/auto-renew` - Toggle automatic renewal
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(start_subscription))
        .route("/change-plan", post(change_plan))
        .route("/:id", get(get_subscription))
        .route("/:id/events", post(apply_billing_event))
        .route("/:id/renew", post(renew_subscription))
        .route("/:id/auto-renew", put(set_auto_renew))
}
