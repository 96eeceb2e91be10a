//! StartSubscriptionHandler - Command handler for opening an owner's plan.
//!
//! An owner may hold one current record. Starting a second one is a
//! conflict; plan changes go through `ChangePlanHandler` instead.

use std::sync::Arc;
use tracing::info;

use crate::domain::entitlement::EntitlementResolver;
use crate::domain::foundation::{ErrorCode, OwnerId, SubscriptionId, Timestamp};
use crate::domain::subscription::{BillingCycle, PaidTerms, Subscription, SubscriptionError, Tier};
use crate::ports::SubscriptionRepository;

/// Default trial length.
pub const DEFAULT_TRIAL_DAYS: u32 = 30;

/// How the plan is being started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartKind {
    /// Free evaluation of `tier` for the given number of days.
    Trial { days: u32 },
    /// Paid from day one.
    Paid(PaidTerms),
}

/// Command to start a subscription.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCommand {
    pub owner_id: OwnerId,
    pub tier: Tier,
    pub billing_cycle: BillingCycle,
    pub kind: StartKind,
}

/// Result of starting a subscription.
#[derive(Debug, Clone)]
pub struct StartSubscriptionResult {
    pub subscription: Subscription,
}

/// Handler for starting subscriptions.
pub struct StartSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    resolver: EntitlementResolver,
}

impl StartSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, resolver: EntitlementResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// # Errors
    ///
    /// - `AlreadyExists` if the owner already has a current record
    /// - `ValidationFailed` for a paid start on a tier that is not for sale,
    ///   a zero-day trial, or malformed payment terms
    pub async fn handle(
        &self,
        cmd: StartSubscriptionCommand,
    ) -> Result<StartSubscriptionResult, SubscriptionError> {
        let existing = self
            .repository
            .find_active_by_owner(&cmd.owner_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?;
        if existing.is_some() {
            return Err(SubscriptionError::already_exists(cmd.owner_id));
        }

        let now = Timestamp::now();
        let subscription = match cmd.kind {
            StartKind::Trial { days } => {
                if days == 0 {
                    return Err(SubscriptionError::validation(
                        "trial_days",
                        "Trial must last at least one day",
                    ));
                }
                Subscription::start_trial(
                    SubscriptionId::new(),
                    cmd.owner_id.clone(),
                    cmd.tier,
                    cmd.billing_cycle,
                    days,
                    now,
                )
            }
            StartKind::Paid(terms) => {
                self.require_purchasable(cmd.tier)?;
                Subscription::start_paid(
                    SubscriptionId::new(),
                    cmd.owner_id.clone(),
                    cmd.tier,
                    cmd.billing_cycle,
                    terms,
                    now,
                )?
            }
        };

        self.repository.save(&subscription).await.map_err(|e| {
            if e.code == ErrorCode::SubscriptionExists {
                SubscriptionError::already_exists(cmd.owner_id.clone())
            } else {
                SubscriptionError::infrastructure(e.to_string())
            }
        })?;

        info!(
            subscription_id = %subscription.id,
            owner_id = %subscription.owner_id,
            tier = %subscription.tier,
            status = %subscription.status,
            billing_cycle = %subscription.billing_cycle,
            "subscription started"
        );

        Ok(StartSubscriptionResult { subscription })
    }

    fn require_purchasable(&self, tier: Tier) -> Result<(), SubscriptionError> {
        let purchasable = self
            .resolver
            .catalogue()
            .entry(tier)
            .map(|entry| entry.purchasable)
            .unwrap_or(false);
        if !purchasable || tier.is_complimentary() {
            return Err(SubscriptionError::validation(
                "tier",
                format!("{} cannot be purchased", self.resolver.catalogue().display_name(tier)),
            ));
        }
        Ok(())
    }
}
