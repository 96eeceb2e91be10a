//! ChangePlanHandler - Command handler for upgrades, downgrades and
//! lateral moves.
//!
//! The current record is closed and a new active record is opened on the
//! target tier in one repository call, so the owner's history keeps both.

use std::sync::Arc;
use tracing::info;

use crate::domain::entitlement::{EntitlementResolver, PlanChange};
use crate::domain::foundation::{OwnerId, SubscriptionId, Timestamp};
use crate::domain::subscription::{BillingCycle, Subscription, SubscriptionError, Tier};
use crate::ports::SubscriptionRepository;

/// Command to move an owner onto another tier or billing cycle.
#[derive(Debug, Clone)]
pub struct ChangePlanCommand {
    pub owner_id: OwnerId,
    pub new_tier: Tier,
    /// Keeps the current cycle when `None`.
    pub new_cycle: Option<BillingCycle>,
    /// Price per period on the new plan, in pence.
    pub amount_pence: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ChangePlanResult {
    pub previous: Subscription,
    pub current: Subscription,
    pub change: PlanChange,
}

pub struct ChangePlanHandler {
    repository: Arc<dyn SubscriptionRepository>,
    resolver: EntitlementResolver,
}

impl ChangePlanHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, resolver: EntitlementResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// # Errors
    ///
    /// - `NotFoundForOwner` if there is no current record
    /// - `ValidationFailed` if nothing would change or the target is not for sale
    /// - `InvalidState` if the current record is past due or unpaid, or was
    ///   closed by a concurrent request
    /// - `AlreadyExists` or `Conflict` if a concurrent request changed the
    ///   owner's plan first
    pub async fn handle(&self, cmd: ChangePlanCommand) -> Result<ChangePlanResult, SubscriptionError> {
        let mut previous = self
            .repository
            .find_active_by_owner(&cmd.owner_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?
            .ok_or_else(|| SubscriptionError::not_found_for_owner(cmd.owner_id.clone()))?;

        let new_cycle = cmd.new_cycle.unwrap_or(previous.billing_cycle);
        if cmd.new_tier == previous.tier && new_cycle == previous.billing_cycle {
            return Err(SubscriptionError::validation(
                "new_tier",
                format!("Owner is already on {} billed {}", previous.tier, new_cycle),
            ));
        }

        let catalogue = self.resolver.catalogue();
        let for_sale = catalogue
            .entry(cmd.new_tier)
            .map(|entry| entry.purchasable)
            .unwrap_or(false);
        if !for_sale {
            return Err(SubscriptionError::validation(
                "new_tier",
                format!("{} cannot be purchased", catalogue.display_name(cmd.new_tier)),
            ));
        }

        let change = self.resolver.classify_change(previous.tier, cmd.new_tier);
        let current = previous.supersede(
            SubscriptionId::new(),
            cmd.new_tier,
            new_cycle,
            cmd.amount_pence,
            Timestamp::now(),
        )?;

        self.repository.supersede(&previous, &current).await?;

        info!(
            owner_id = %cmd.owner_id,
            from_tier = %previous.tier,
            to_tier = %current.tier,
            change = ?change,
            closed_id = %previous.id,
            opened_id = %current.id,
            "plan changed"
        );

        Ok(ChangePlanResult {
            previous,
            current,
            change,
        })
    }
}
