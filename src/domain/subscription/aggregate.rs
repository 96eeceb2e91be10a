//! Subscription aggregate entity.
//!
//! A Subscription is one owner's plan record. Records are never deleted:
//! cancellation and trial expiry close the record by setting `ended_at`,
//! and a plan change closes the old record and opens a replacement.
//!
//! # Invariants
//!
//! - At most one current (non-terminal) record per owner; enforced by the
//!   repository, not by this type.
//! - Status changes go through [`SubscriptionStatus`]'s state machine.
//! - `ended_at` is set exactly when the status is terminal.
//! - Monetary amounts are integer pence.
//! - `version` is the stored revision this copy was read at. Repositories
//!   refuse a write whose version no longer matches.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, OwnerId, StateMachine, SubscriptionId, Timestamp,
};

use super::{BillingCycle, SubscriptionStatus, Tier};

/// Currency used when the billing provider does not specify one.
pub const DEFAULT_CURRENCY: &str = "GBP";

/// Revision of a record that has never been written.
pub const INITIAL_VERSION: u32 = 1;

/// Commercial terms supplied by the billing provider for a paid plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidTerms {
    /// Seat count, if the plan is sold per seat.
    pub quantity: Option<u32>,
    /// Price per billing period in pence.
    pub amount_pence: Option<i64>,
    pub currency: String,
}

impl Default for PaidTerms {
    fn default() -> Self {
        Self {
            quantity: None,
            amount_pence: None,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl PaidTerms {
    fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == Some(0) {
            return Err(DomainError::validation(
                "quantity",
                "Quantity must be at least 1 when present",
            ));
        }
        if matches!(self.amount_pence, Some(amount) if amount < 0) {
            return Err(DomainError::validation(
                "amount_pence",
                "Amount cannot be negative",
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "currency",
                format!("'{}' is not an ISO 4217 code", self.currency),
            ));
        }
        Ok(())
    }
}

/// One owner's subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,

    /// Organization or user holding the plan.
    pub owner_id: OwnerId,

    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,

    pub started_at: Timestamp,

    /// End of the current billing period (or trial).
    pub current_period_end: Timestamp,

    /// Set when the record is closed (cancelled, superseded, trial expired).
    pub ended_at: Option<Timestamp>,

    pub quantity: Option<u32>,
    pub amount_pence: Option<i64>,
    pub currency: String,
    pub auto_renew: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Stored revision, starting at 1. Only repositories advance it.
    pub version: u32,
}

impl Subscription {
    /// Start a free trial. The record begins in `Trialing`.
    pub fn start_trial(
        id: SubscriptionId,
        owner_id: OwnerId,
        tier: Tier,
        billing_cycle: BillingCycle,
        trial_days: u32,
        at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            tier,
            status: SubscriptionStatus::Trialing,
            billing_cycle,
            started_at: at,
            current_period_end: at.add_days(i64::from(trial_days)),
            ended_at: None,
            quantity: None,
            amount_pence: None,
            currency: DEFAULT_CURRENCY.to_string(),
            auto_renew: false,
            created_at: at,
            updated_at: at,
            version: INITIAL_VERSION,
        }
    }

    /// Start a paid plan. Payment has already been taken, so the record
    /// begins in `Active`.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the terms are malformed.
    pub fn start_paid(
        id: SubscriptionId,
        owner_id: OwnerId,
        tier: Tier,
        billing_cycle: BillingCycle,
        terms: PaidTerms,
        at: Timestamp,
    ) -> Result<Self, DomainError> {
        terms.validate()?;
        Ok(Self {
            id,
            owner_id,
            tier,
            status: SubscriptionStatus::Active,
            billing_cycle,
            started_at: at,
            current_period_end: billing_cycle.period_end(at),
            ended_at: None,
            quantity: terms.quantity,
            amount_pence: terms.amount_pence,
            currency: terms.currency,
            auto_renew: true,
            created_at: at,
            updated_at: at,
            version: INITIAL_VERSION,
        })
    }

    /// Returns true if the status currently grants feature access.
    pub fn grants_access(&self) -> bool {
        self.status.grants_access()
    }

    /// Returns true while this is the owner's current record.
    pub fn is_current(&self) -> bool {
        self.status.is_current()
    }

    /// Convert a trial into a paid plan.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless the record is trialing.
    pub fn activate(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.require_status(SubscriptionStatus::Trialing, "activate")?;
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_end = self.billing_cycle.period_end(at);
        self.auto_renew = true;
        self.updated_at = at;
        Ok(())
    }

    /// A renewal payment failed.
    pub fn mark_past_due(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::PastDue)?;
        self.updated_at = at;
        Ok(())
    }

    /// A retried payment succeeded; a new billing period starts at `at`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless the record is past due.
    pub fn recover_payment(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.require_status(SubscriptionStatus::PastDue, "recover payment for")?;
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_end = self.billing_cycle.period_end(at);
        self.updated_at = at;
        Ok(())
    }

    /// Payment retries are exhausted.
    pub fn mark_unpaid(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Unpaid)?;
        self.updated_at = at;
        Ok(())
    }

    /// The trial ended with no payment method attached.
    pub fn expire_trial(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::TrialExpired)?;
        self.close(at);
        Ok(())
    }

    /// Cancel the plan. The record stays for audit with `ended_at` set.
    pub fn cancel(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.close(at);
        Ok(())
    }

    /// Extend an active plan by one billing period from the current
    /// period end.
    ///
    /// # Errors
    ///
    /// `SubscriptionInactive` unless the record is active.
    pub fn renew(&mut self, at: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::new(
                ErrorCode::SubscriptionInactive,
                format!("Cannot renew subscription in {} state", self.status),
            ));
        }
        self.current_period_end = self.billing_cycle.period_end(self.current_period_end);
        self.updated_at = at;
        Ok(())
    }

    /// Toggle automatic renewal.
    ///
    /// # Errors
    ///
    /// `SubscriptionInactive` if the record is already closed.
    pub fn set_auto_renew(&mut self, auto_renew: bool, at: Timestamp) -> Result<(), DomainError> {
        if !self.is_current() {
            return Err(DomainError::new(
                ErrorCode::SubscriptionInactive,
                format!("Subscription {} is closed", self.id),
            ));
        }
        self.auto_renew = auto_renew;
        self.updated_at = at;
        Ok(())
    }

    /// Close this record and return its replacement on `new_tier`.
    ///
    /// The replacement is a new active record with a fresh billing period.
    /// A trialing record is converted before it is closed so the history
    /// shows the conversion. Seat count and currency carry over.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless the record is active or trialing.
    pub fn supersede(
        &mut self,
        new_id: SubscriptionId,
        new_tier: Tier,
        new_cycle: BillingCycle,
        amount_pence: Option<i64>,
        at: Timestamp,
    ) -> Result<Subscription, DomainError> {
        if !self.grants_access() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot change plan of subscription in {} state", self.status),
            ));
        }

        let terms = PaidTerms {
            quantity: self.quantity,
            amount_pence,
            currency: self.currency.clone(),
        };
        let mut replacement = Subscription::start_paid(
            new_id,
            self.owner_id.clone(),
            new_tier,
            new_cycle,
            terms,
            at,
        )?;
        replacement.auto_renew = self.auto_renew || self.status == SubscriptionStatus::Trialing;

        if self.status == SubscriptionStatus::Trialing {
            self.transition_to(SubscriptionStatus::Active)?;
        }
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.close(at);

        Ok(replacement)
    }

    fn close(&mut self, at: Timestamp) {
        self.ended_at = Some(at);
        self.auto_renew = false;
        self.updated_at = at;
    }

    fn require_status(&self, expected: SubscriptionStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot {} subscription in {} state", action, self.status),
            ));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|err| {
            DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
                .with_detail("subscription_id", self.id.to_string())
        })?;
        Ok(())
    }
}
