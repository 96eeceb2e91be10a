//! HTTP DTOs (Data Transfer Objects) for entitlement endpoints.
//!
//! The shapes are meant for direct use by the upgrade-prompt UI: a boolean
//! answer, the reason in plain words, and for capacity the raw numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::handlers::{
    CheckCapacityResult, CheckFeatureAccessResult, EntitlementSummary, ReserveCapacityResult,
};
use crate::domain::entitlement::{CapacityCheck, DenialReason, RequiredAction, TierEntry};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{
    Audience, CapacityLimit, CapacityLimits, Feature, ResourceKind, SubscriptionStatus, Tier,
};

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Answer to "may this owner use this feature?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAccessResponse {
    pub owner_id: String,
    pub feature: Feature,
    pub granted: bool,
    pub current_tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,
    /// Present only when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    /// Prompt text for the upgrade dialog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FeatureAccessResponse {
    pub fn new(owner_id: &OwnerId, feature: Feature, result: CheckFeatureAccessResult) -> Self {
        let denial = result.access.denial().cloned();
        Self {
            owner_id: owner_id.to_string(),
            feature,
            granted: result.access.is_granted(),
            current_tier: result.tier,
            status: result.status,
            reason: denial.as_ref().map(|d| d.reason),
            message: denial.as_ref().map(|d| d.user_message()),
            required_action: denial.map(|d| d.action),
        }
    }
}

/// Answer to "is this owner within its limit for this resource?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityResponse {
    pub owner_id: String,
    pub resource: ResourceKind,
    pub within_limit: bool,
    pub current: u32,
    pub limit: CapacityLimit,
    /// `None` when the limit is unlimited.
    pub remaining: Option<u32>,
    /// e.g. `"42/100 students"`.
    pub display: String,
    pub tier: Option<Tier>,
}

impl CapacityResponse {
    pub fn new(owner_id: &OwnerId, check: CapacityCheck, tier: Option<Tier>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            resource: check.resource,
            within_limit: check.within_limit,
            current: check.current,
            limit: check.limit,
            remaining: check.remaining(),
            display: check.display(),
            tier,
        }
    }

    pub fn from_result(owner_id: &OwnerId, result: CheckCapacityResult) -> Self {
        Self::new(owner_id, result.check, result.tier)
    }
}

/// Result of a reservation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveCapacityResponse {
    pub reserved: bool,
    pub capacity: CapacityResponse,
}

impl ReserveCapacityResponse {
    pub fn new(owner_id: &OwnerId, result: ReserveCapacityResult) -> Self {
        Self {
            reserved: result.reserved,
            capacity: CapacityResponse::new(owner_id, result.check, None),
        }
    }
}

/// Everything one owner may use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementsResponse {
    pub owner_id: String,
    pub tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,
    pub features: BTreeMap<Feature, bool>,
    pub limits: CapacityLimits,
}

impl EntitlementsResponse {
    pub fn new(owner_id: &OwnerId, summary: EntitlementSummary) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            tier: summary.tier,
            status: summary.status,
            features: summary
                .features
                .iter()
                .map(|(feature, access)| (*feature, access.is_granted()))
                .collect(),
            limits: summary.limits,
        }
    }
}

/// One catalogue row, for pricing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierResponse {
    pub id: Tier,
    pub display_name: String,
    pub rank: u32,
    pub audience: Audience,
    pub purchasable: bool,
    pub sales_led: bool,
    pub limits: CapacityLimits,
    pub features: Vec<Feature>,
}

impl From<&TierEntry> for TierResponse {
    fn from(entry: &TierEntry) -> Self {
        Self {
            id: entry.tier,
            display_name: entry.display_name.clone(),
            rank: entry.rank,
            audience: entry.tier.audience(),
            purchasable: entry.purchasable,
            sales_led: entry.sales_led,
            limits: entry.limits,
            features: entry.included_features(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierListResponse {
    pub tiers: Vec<TierResponse>,
}
