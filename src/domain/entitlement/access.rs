//! Result records returned by the entitlement resolver.
//!
//! A denial is a normal return value, never an error. Each denial carries
//! enough for an upgrade prompt: the feature, the current tier, and what
//! the user has to do next.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::{CapacityLimit, Feature, ResourceKind, Tier};

/// Outcome of a feature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "denial", rename_all = "snake_case")]
pub enum FeatureAccess {
    Granted,
    Denied(FeatureDenial),
}

impl FeatureAccess {
    /// Fail-closed denial for when the subscription could not be loaded.
    pub fn unavailable(feature: Feature) -> Self {
        FeatureAccess::Denied(FeatureDenial {
            reason: DenialReason::SubscriptionUnavailable,
            feature,
            current_tier: None,
            current_tier_name: None,
            action: RequiredAction::RetryLater,
        })
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, FeatureAccess::Granted)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_granted()
    }

    pub fn denial(&self) -> Option<&FeatureDenial> {
        match self {
            FeatureAccess::Granted => None,
            FeatureAccess::Denied(denial) => Some(denial),
        }
    }

    /// Converts the outcome to a Result, with a denial becoming the error.
    pub fn into_result(self) -> Result<(), FeatureDenial> {
        match self {
            FeatureAccess::Granted => Ok(()),
            FeatureAccess::Denied(denial) => Err(denial),
        }
    }
}

/// Why a feature check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No subscription, or one whose status does not grant access.
    NoActiveSubscription,
    /// The tier's feature row does not include the feature.
    NotInTier,
    /// The subscription store could not answer.
    SubscriptionUnavailable,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoActiveSubscription => "no_active_subscription",
            DenialReason::NotInTier => "not_in_tier",
            DenialReason::SubscriptionUnavailable => "subscription_unavailable",
        }
    }
}

/// Next step offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    /// Pick any plan.
    Subscribe,
    /// Fix the failed payment.
    UpdatePayment,
    /// Self-serve upgrade to the named tier.
    Upgrade { to: Tier, display_name: String },
    /// Talk to sales; `suggested` names the cheapest tier with the feature.
    ContactSales { suggested: Option<Tier> },
    /// Transient failure; try again shortly.
    RetryLater,
}

/// Details of a denied feature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDenial {
    pub reason: DenialReason,
    pub feature: Feature,
    pub current_tier: Option<Tier>,
    pub current_tier_name: Option<String>,
    pub action: RequiredAction,
}

impl FeatureDenial {
    /// Prompt text for the upgrade dialog.
    pub fn user_message(&self) -> String {
        let feature = self.feature.display_name();
        match (&self.reason, &self.action) {
            (DenialReason::SubscriptionUnavailable, _) => format!(
                "We couldn't confirm your subscription, so {} is unavailable right now. Please try again shortly.",
                feature
            ),
            (DenialReason::NoActiveSubscription, RequiredAction::UpdatePayment) => format!(
                "{} is paused because your last payment failed. Update your payment details to restore access.",
                feature
            ),
            (DenialReason::NoActiveSubscription, _) => {
                format!("{} requires an active subscription. Choose a plan to continue.", feature)
            }
            (DenialReason::NotInTier, RequiredAction::Upgrade { display_name, .. }) => format!(
                "{} is not included in your {} plan. Upgrade to {} to unlock it.",
                feature,
                self.tier_label(),
                display_name
            ),
            (DenialReason::NotInTier, _) => format!(
                "{} is not included in your {} plan. Contact our sales team to add it.",
                feature,
                self.tier_label()
            ),
        }
    }

    fn tier_label(&self) -> &str {
        match (&self.current_tier_name, &self.current_tier) {
            (Some(name), _) => name.as_str(),
            (None, Some(tier)) => tier.as_str(),
            (None, None) => "current",
        }
    }
}

/// Outcome of a capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityCheck {
    pub resource: ResourceKind,
    pub within_limit: bool,
    pub current: u32,
    pub limit: CapacityLimit,
}

impl CapacityCheck {
    /// Inclusive check of `current` against `limit`.
    pub fn evaluate(resource: ResourceKind, current: u32, limit: CapacityLimit) -> Self {
        Self {
            resource,
            within_limit: limit.allows(current),
            current,
            limit,
        }
    }

    /// Fail-closed result for when usage could not be read.
    pub fn unavailable(resource: ResourceKind, limit: CapacityLimit) -> Self {
        Self {
            resource,
            within_limit: false,
            current: 0,
            limit,
        }
    }

    /// Units left before the cap, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.limit.max().map(|max| max.saturating_sub(self.current))
    }

    /// Short form for display, e.g. `42/100 users`.
    pub fn display(&self) -> String {
        format!("{}/{} {}", self.current, self.limit, self.resource)
    }
}

/// Direction of a plan change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanChange {
    Upgrade,
    Downgrade,
    /// Same rank, e.g. a billing-cycle change only.
    Lateral,
}
