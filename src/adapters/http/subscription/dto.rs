//! HTTP DTOs for the subscription lifecycle endpoints.
//!
//! These are called by the billing integration, not by end users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::BillingEvent;
use crate::domain::entitlement::PlanChange;
use crate::domain::foundation::{OwnerId, Timestamp};
use crate::domain::subscription::{
    BillingCycle, PaidTerms, Subscription, SubscriptionError, SubscriptionStatus, Tier,
    DEFAULT_CURRENCY,
};
use crate::ports::{ListOptions, SortDirection, SortField, SubscriptionPage};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open an owner's first (or next) plan.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSubscriptionRequest {
    pub owner_id: String,
    pub tier: Tier,
    pub billing_cycle: BillingCycle,
    /// Starts a trial of this length when present; otherwise the plan is paid.
    #[serde(default)]
    pub trial_days: Option<u32>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount_pence: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl StartSubscriptionRequest {
    pub fn paid_terms(&self) -> PaidTerms {
        PaidTerms {
            quantity: self.quantity,
            amount_pence: self.amount_pence,
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        }
    }
}

/// Request to move an owner to another tier or cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanRequest {
    pub owner_id: String,
    pub new_tier: Tier,
    #[serde(default)]
    pub new_cycle: Option<BillingCycle>,
    #[serde(default)]
    pub amount_pence: Option<i64>,
}

/// A lifecycle event from the billing provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEventRequest {
    pub event: BillingEvent,
    /// Defaults to the time the request is received.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoRenewRequest {
    pub auto_renew: bool,
}

/// Query string for `GET /api/subscriptions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSubscriptionsParams {
    pub owner_id: Option<String>,
    pub tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub current_only: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl ListSubscriptionsParams {
    pub fn into_options(self) -> Result<ListOptions, SubscriptionError> {
        let mut options = match (self.page, self.per_page) {
            (None, None) => ListOptions::default(),
            (page, per_page) => ListOptions::paginated(
                page.unwrap_or(1),
                per_page.unwrap_or(crate::application::handlers::subscription::DEFAULT_PAGE_SIZE),
            ),
        };
        if let Some(owner_id) = self.owner_id {
            let owner_id = OwnerId::new(owner_id)
                .map_err(|e| SubscriptionError::validation("owner_id", e.to_string()))?;
            options = options.for_owner(owner_id);
        }
        if let Some(tier) = self.tier {
            options = options.with_tier(tier);
        }
        if let Some(status) = self.status {
            options = options.with_status(status);
        }
        if self.current_only {
            options = options.current_only();
        }
        options = options.sorted_by(
            self.sort_by.unwrap_or_default(),
            self.direction.unwrap_or_default(),
        );
        Ok(options)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub owner_id: String,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    /// Whether the status currently grants feature access.
    pub grants_access: bool,
    /// ISO 8601.
    pub started_at: String,
    pub current_period_end: String,
    pub ended_at: Option<String>,
    pub quantity: Option<u32>,
    pub amount_pence: Option<i64>,
    pub currency: String,
    pub auto_renew: bool,
}

fn iso(ts: &Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(s: &Subscription) -> Self {
        Self {
            id: s.id.to_string(),
            owner_id: s.owner_id.to_string(),
            tier: s.tier,
            status: s.status,
            billing_cycle: s.billing_cycle,
            grants_access: s.grants_access(),
            started_at: iso(&s.started_at),
            current_period_end: iso(&s.current_period_end),
            ended_at: s.ended_at.as_ref().map(iso),
            quantity: s.quantity,
            amount_pence: s.amount_pence,
            currency: s.currency.clone(),
            auto_renew: s.auto_renew,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionListResponse {
    pub items: Vec<SubscriptionResponse>,
    pub total: u64,
    pub has_more: bool,
}

impl From<SubscriptionPage> for SubscriptionListResponse {
    fn from(page: SubscriptionPage) -> Self {
        Self {
            items: page.items.iter().map(SubscriptionResponse::from).collect(),
            total: page.total,
            has_more: page.has_more,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePlanResponse {
    pub change: PlanChange,
    pub previous: SubscriptionResponse,
    pub current: SubscriptionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub previous_status: SubscriptionStatus,
    pub subscription: SubscriptionResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_defaults_currency() {
        let request: StartSubscriptionRequest = serde_json::from_value(serde_json::json!({
            "owner_id": "school-1",
            "tier": "school_small",
            "billing_cycle": "annually",
            "amount_pence": 99_000
        }))
        .unwrap();

        assert!(request.trial_days.is_none());
        let terms = request.paid_terms();
        assert_eq!(terms.currency, "GBP");
        assert_eq!(terms.amount_pence, Some(99_000));
    }

    #[test]
    fn unknown_tier_in_request_is_rejected() {
        let result: Result<StartSubscriptionRequest, _> = serde_json::from_value(serde_json::json!({
            "owner_id": "school-1",
            "tier": "platinum",
            "billing_cycle": "monthly"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn billing_event_request_parses_snake_case() {
        let request: BillingEventRequest =
            serde_json::from_value(serde_json::json!({ "event": "grace_period_exhausted" }))
                .unwrap();
        assert_eq!(request.event, BillingEvent::GracePeriodExhausted);
        assert!(request.occurred_at.is_none());
    }

    #[test]
    fn list_params_build_filters() {
        let params = ListSubscriptionsParams {
            owner_id: Some("trust-4".to_string()),
            status: Some(SubscriptionStatus::Cancelled),
            page: Some(3),
            per_page: Some(10),
            ..Default::default()
        };
        let options = params.into_options().unwrap();

        assert_eq!(options.offset, Some(20));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.status, Some(SubscriptionStatus::Cancelled));
        assert_eq!(options.owner_id.unwrap().as_str(), "trust-4");
    }

    #[test]
    fn blank_owner_filter_is_rejected() {
        let params = ListSubscriptionsParams {
            owner_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(params.into_options().is_err());
    }
}
