//! GetEntitlementsHandler - Everything one owner may use, in one lookup.
//!
//! Front ends call this once per page load to decide which navigation
//! entries to show, instead of issuing one feature check per entry.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::domain::entitlement::{EntitlementResolver, FeatureAccess};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{CapacityLimits, Feature, SubscriptionStatus, Tier};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct GetEntitlementsQuery {
    pub owner_id: OwnerId,
}

/// Resolved entitlements for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementSummary {
    pub tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,
    pub features: BTreeMap<Feature, FeatureAccess>,
    /// Limits of the current tier; zero everywhere without an access-granting plan.
    pub limits: CapacityLimits,
}

impl EntitlementSummary {
    pub fn granted_features(&self) -> Vec<Feature> {
        self.features
            .iter()
            .filter(|(_, access)| access.is_granted())
            .map(|(feature, _)| *feature)
            .collect()
    }
}

pub struct GetEntitlementsHandler {
    repository: Arc<dyn SubscriptionRepository>,
    resolver: EntitlementResolver,
}

impl GetEntitlementsHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, resolver: EntitlementResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    pub async fn handle(&self, query: GetEntitlementsQuery) -> EntitlementSummary {
        let subscription = match self.repository.find_active_by_owner(&query.owner_id).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(
                    owner_id = %query.owner_id,
                    error = %err,
                    "subscription lookup failed, denying all features"
                );
                return EntitlementSummary {
                    tier: None,
                    status: None,
                    features: Feature::ALL
                        .into_iter()
                        .map(|feature| (feature, FeatureAccess::unavailable(feature)))
                        .collect(),
                    limits: CapacityLimits::NONE,
                };
            }
        };

        let features = Feature::ALL
            .into_iter()
            .map(|feature| {
                (
                    feature,
                    self.resolver.has_feature_access(subscription.as_ref(), feature),
                )
            })
            .collect();

        let limits = subscription
            .as_ref()
            .filter(|s| s.grants_access())
            .map(|s| self.resolver.catalogue().limits(s.tier))
            .unwrap_or(CapacityLimits::NONE);

        EntitlementSummary {
            tier: subscription.as_ref().map(|s| s.tier),
            status: subscription.as_ref().map(|s| s.status),
            features,
            limits,
        }
    }
}
