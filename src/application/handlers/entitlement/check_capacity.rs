//! CheckCapacityHandler - Query handler for capacity limits.
//!
//! Fails closed: if either the subscription or the usage counters cannot
//! be read, the result reports `within_limit = false`.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::entitlement::{CapacityCheck, EntitlementResolver};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{CapacityLimit, ResourceKind, Tier};
use crate::ports::{CapacityUsageStore, SubscriptionRepository};

/// Query to check one resource for one owner.
#[derive(Debug, Clone)]
pub struct CheckCapacityQuery {
    pub owner_id: OwnerId,
    pub resource: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCapacityResult {
    pub check: CapacityCheck,
    /// Tier the limit came from; `None` when there is no active plan.
    pub tier: Option<Tier>,
}

/// Handler for capacity checks.
pub struct CheckCapacityHandler {
    repository: Arc<dyn SubscriptionRepository>,
    usage_store: Arc<dyn CapacityUsageStore>,
    resolver: EntitlementResolver,
}

impl CheckCapacityHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        usage_store: Arc<dyn CapacityUsageStore>,
        resolver: EntitlementResolver,
    ) -> Self {
        Self {
            repository,
            usage_store,
            resolver,
        }
    }

    pub async fn handle(&self, query: CheckCapacityQuery) -> CheckCapacityResult {
        let no_plan = CapacityLimit::Limited(0);

        let tier = match self.repository.find_active_by_owner(&query.owner_id).await {
            Ok(subscription) => subscription.filter(|s| s.grants_access()).map(|s| s.tier),
            Err(err) => {
                warn!(
                    owner_id = %query.owner_id,
                    resource = %query.resource,
                    error = %err,
                    "subscription lookup failed, reporting capacity exceeded"
                );
                return CheckCapacityResult {
                    check: CapacityCheck::unavailable(query.resource, no_plan),
                    tier: None,
                };
            }
        };

        let limit = tier
            .map(|tier| self.resolver.catalogue().limits(tier).limit_for(query.resource))
            .unwrap_or(no_plan);

        let usage = match self.usage_store.get_usage(&query.owner_id).await {
            Ok(usage) => usage,
            Err(err) => {
                warn!(
                    owner_id = %query.owner_id,
                    resource = %query.resource,
                    error = %err,
                    "usage lookup failed, reporting capacity exceeded"
                );
                return CheckCapacityResult {
                    check: CapacityCheck::unavailable(query.resource, limit),
                    tier,
                };
            }
        };

        let check = match tier {
            Some(tier) => self.resolver.check_capacity(&usage, tier, query.resource),
            None => CapacityCheck::evaluate(query.resource, usage.current(query.resource), no_plan),
        };

        debug!(
            owner_id = %query.owner_id,
            resource = %query.resource,
            tier = ?tier,
            usage = %check.display(),
            within_limit = check.within_limit,
            "capacity checked"
        );

        CheckCapacityResult { check, tier }
    }
}
