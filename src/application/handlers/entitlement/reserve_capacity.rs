//! Reserve and release capacity.
//!
//! Provisioning code calls `ReserveCapacityHandler` before it creates a
//! user, student or school, and `ReleaseCapacityHandler` after it removes
//! one. The reservation is an atomic check-and-increment in the store, so
//! two concurrent requests cannot both take the last seat. The reported
//! usage comes from that same step, so a reservation is never reported as
//! failed after a unit was taken.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::entitlement::{CapacityCheck, EntitlementResolver};
use crate::domain::foundation::OwnerId;
use crate::domain::subscription::{ResourceKind, SubscriptionError};
use crate::ports::{CapacityUsageStore, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct ReserveCapacityCommand {
    pub owner_id: OwnerId,
    pub resource: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveCapacityResult {
    /// True if a unit was taken.
    pub reserved: bool,
    /// Usage after the attempt.
    pub check: CapacityCheck,
}

pub struct ReserveCapacityHandler {
    repository: Arc<dyn SubscriptionRepository>,
    usage_store: Arc<dyn CapacityUsageStore>,
    resolver: EntitlementResolver,
}

impl ReserveCapacityHandler {
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

    /// # Errors
    ///
    /// - `NotFoundForOwner` if the owner has no plan that grants access
    /// - `Infrastructure` if the repository or the increment fails
    pub async fn handle(
        &self,
        cmd: ReserveCapacityCommand,
    ) -> Result<ReserveCapacityResult, SubscriptionError> {
        let subscription = self
            .repository
            .find_active_by_owner(&cmd.owner_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?
            .filter(|s| s.grants_access())
            .ok_or_else(|| SubscriptionError::not_found_for_owner(cmd.owner_id.clone()))?;

        let limit = self
            .resolver
            .catalogue()
            .limits(subscription.tier)
            .limit_for(cmd.resource);

        let reservation = self
            .usage_store
            .try_increment(&cmd.owner_id, cmd.resource, limit)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?;

        let reserved = reservation.is_reserved();
        let check = CapacityCheck::evaluate(cmd.resource, reservation.current(), limit);

        if reserved {
            info!(
                owner_id = %cmd.owner_id,
                resource = %cmd.resource,
                usage = %check.display(),
                "capacity reserved"
            );
        } else {
            warn!(
                owner_id = %cmd.owner_id,
                resource = %cmd.resource,
                tier = %subscription.tier,
                usage = %check.display(),
                "capacity reservation refused at limit"
            );
        }

        Ok(ReserveCapacityResult { reserved, check })
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseCapacityCommand {
    pub owner_id: OwnerId,
    pub resource: ResourceKind,
}

pub struct ReleaseCapacityHandler {
    usage_store: Arc<dyn CapacityUsageStore>,
}

impl ReleaseCapacityHandler {
    pub fn new(usage_store: Arc<dyn CapacityUsageStore>) -> Self {
        Self { usage_store }
    }

    /// Give back one unit. Counters never go below zero.
    pub async fn handle(&self, cmd: ReleaseCapacityCommand) -> Result<(), SubscriptionError> {
        self.usage_store
            .decrement(&cmd.owner_id, cmd.resource)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?;
        info!(owner_id = %cmd.owner_id, resource = %cmd.resource, "capacity released");
        Ok(())
    }
}
