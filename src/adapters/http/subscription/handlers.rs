//! HTTP handlers for subscription lifecycle endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::AppState;
use crate::application::handlers::{
    ChangePlanCommand, ListSubscriptionsQuery, RenewSubscriptionCommand, SetAutoRenewCommand,
    StartKind, StartSubscriptionCommand, TransitionStatusCommand,
};
use crate::domain::foundation::{OwnerId, SubscriptionId, Timestamp};
use crate::domain::subscription::SubscriptionError;

use super::dto::{
    AutoRenewRequest, BillingEventRequest, ChangePlanRequest, ChangePlanResponse,
    ListSubscriptionsParams, StartSubscriptionRequest, SubscriptionListResponse,
    SubscriptionResponse, TransitionResponse,
};

fn parse_owner(raw: String) -> Result<OwnerId, ApiError> {
    OwnerId::new(raw).map_err(|e| ApiError(SubscriptionError::validation("owner_id", e.to_string())))
}

fn parse_id(raw: &str) -> Result<SubscriptionId, ApiError> {
    raw.parse().map_err(|_| {
        ApiError(SubscriptionError::validation(
            "id",
            format!("'{}' is not a subscription id", raw),
        ))
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions - Filtered, paginated history
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<ListSubscriptionsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let options = params.into_options()?;
    let page = state
        .list_subscriptions_handler()
        .handle(ListSubscriptionsQuery { options })
        .await?;

    Ok(Json(SubscriptionListResponse::from(page)))
}

/// GET /api/subscriptions/:id - One record
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let subscription = state
        .subscription_repository
        .find_by_id(&id)
        .await?
        .ok_or(SubscriptionError::not_found(id))?;

    Ok(Json(SubscriptionResponse::from(&subscription)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST/PUT endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscriptions - Start a trial or paid plan
pub async fn start_subscription(
    State(state): State<AppState>,
    Json(request): Json<StartSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match request.trial_days {
        Some(days) => StartKind::Trial { days },
        None => StartKind::Paid(request.paid_terms()),
    };
    let cmd = StartSubscriptionCommand {
        owner_id: parse_owner(request.owner_id)?,
        tier: request.tier,
        billing_cycle: request.billing_cycle,
        kind,
    };

    let result = state.start_subscription_handler().handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(&result.subscription)),
    ))
}

/// POST /api/subscriptions/change-plan - Upgrade, downgrade or switch cycle
pub async fn change_plan(
    State(state): State<AppState>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = ChangePlanCommand {
        owner_id: parse_owner(request.owner_id)?,
        new_tier: request.new_tier,
        new_cycle: request.new_cycle,
        amount_pence: request.amount_pence,
    };

    let result = state.change_plan_handler().handle(cmd).await?;

    Ok(Json(ChangePlanResponse {
        change: result.change,
        previous: SubscriptionResponse::from(&result.previous),
        current: SubscriptionResponse::from(&result.current),
    }))
}

/// POST /api/subscriptions/:id/events - Apply a billing lifecycle event
pub async fn apply_billing_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BillingEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = TransitionStatusCommand {
        subscription_id: parse_id(&id)?,
        event: request.event,
        occurred_at: request
            .occurred_at
            .map(Timestamp::from_datetime)
            .unwrap_or_else(Timestamp::now),
    };

    let result = state.transition_status_handler().handle(cmd).await?;

    Ok(Json(TransitionResponse {
        previous_status: result.previous_status,
        subscription: SubscriptionResponse::from(&result.subscription),
    }))
}

/// POST /api/subscriptions/:id/renew - Extend by one billing period
pub async fn renew_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = RenewSubscriptionCommand {
        subscription_id: parse_id(&id)?,
    };

    let result = state.renew_subscription_handler().handle(cmd).await?;

    Ok(Json(SubscriptionResponse::from(&result.subscription)))
}

/// PUT /api/subscriptions/:id/auto-renew - Toggle automatic renewal
pub async fn set_auto_renew(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AutoRenewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = SetAutoRenewCommand {
        subscription_id: parse_id(&id)?,
        auto_renew: request.auto_renew,
    };

    let subscription = state.set_auto_renew_handler().handle(cmd).await?;

    Ok(Json(SubscriptionResponse::from(&subscription)))
}
