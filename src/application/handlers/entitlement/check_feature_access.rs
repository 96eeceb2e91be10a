//! CheckFeatureAccessHandler - Query handler for feature gating.
//!
//! This is the hot path: every gated page or API call asks it first.
//! It never returns an error. When the subscription cannot be loaded the
//! answer is a denial with reason `subscription_unavailable`.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::entitlement::{EntitlementResolver, FeatureAccess};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{Feature, SubscriptionStatus, Tier};
use crate::ports::SubscriptionRepository;

/// Query to check one feature for one owner.
#[derive(Debug, Clone)]
pub struct CheckFeatureAccessQuery {
    pub owner_id: OwnerId,
    pub feature: Feature,
}

/// Result of a feature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFeatureAccessResult {
    pub access: FeatureAccess,
    /// Tier of the owner's current record, if one was found.
    pub tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,
}

/// Handler for feature access checks.
pub struct CheckFeatureAccessHandler {
    repository: Arc<dyn SubscriptionRepository>,
    resolver: EntitlementResolver,
}

impl CheckFeatureAccessHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, resolver: EntitlementResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    pub async fn handle(&self, query: CheckFeatureAccessQuery) -> CheckFeatureAccessResult {
        let subscription = match self.repository.find_active_by_owner(&query.owner_id).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(
                    owner_id = %query.owner_id,
                    feature = %query.feature,
                    error = %err,
                    "subscription lookup failed, denying feature access"
                );
                return CheckFeatureAccessResult {
                    access: FeatureAccess::unavailable(query.feature),
                    tier: None,
                    status: None,
                };
            }
        };

        let access = self
            .resolver
            .has_feature_access(subscription.as_ref(), query.feature);

        debug!(
            owner_id = %query.owner_id,
            feature = %query.feature,
            tier = ?subscription.as_ref().map(|s| s.tier),
            granted = access.is_granted(),
            "feature access resolved"
        );

        CheckFeatureAccessResult {
            access,
            tier: subscription.as_ref().map(|s| s.tier),
            status: subscription.as_ref().map(|s| s.status),
        }
    }
}
