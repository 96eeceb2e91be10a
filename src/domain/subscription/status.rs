//! Subscription status state machine.
//!
//! Transitions are driven by the billing provider. The only backward edge is
//! `PastDue -> Active` (payment recovered); `Trialing -> Active` is the trial
//! conversion. `Cancelled` and `TrialExpired` are terminal: reactivation
//! creates a new subscription record.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial running.
    Trialing,

    /// Paid and in good standing.
    Active,

    /// A renewal payment failed; the provider is retrying.
    PastDue,

    /// Retries exhausted without payment.
    Unpaid,

    /// Ended by the customer or the provider.
    Cancelled,

    /// Trial ended with no payment method attached.
    TrialExpired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Unpaid,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::TrialExpired,
    ];

    /// Returns true if features may be used in this status.
    ///
    /// Only `Active` and `Trialing` grant access; there is no grace period
    /// for `PastDue`.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// Returns true while the record is the owner's current plan.
    ///
    /// At most one record per owner may be current.
    pub fn is_current(&self) -> bool {
        !matches!(
            self,
            SubscriptionStatus::Cancelled | SubscriptionStatus::TrialExpired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::TrialExpired => "trial_expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{}'", s))
            })
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIALING
            (Trialing, Active)
                | (Trialing, TrialExpired)
            // From ACTIVE
                | (Active, PastDue)
                | (Active, Cancelled)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Unpaid)
                | (PastDue, Cancelled)
            // From UNPAID
                | (Unpaid, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trialing => vec![Active, TrialExpired],
            Active => vec![PastDue, Cancelled],
            PastDue => vec![Active, Unpaid, Cancelled],
            Unpaid => vec![Cancelled],
            Cancelled => vec![],
            TrialExpired => vec![],
        }
    }
}
