//! Subscription domain module.
//!
//! Plan records, their lifecycle, and the closed sets of tiers, features
//! and capacity resources they are measured against.

mod aggregate;
mod billing_cycle;
mod capacity;
mod errors;
mod feature;
mod status;
mod tier;

pub use aggregate::{PaidTerms, Subscription, DEFAULT_CURRENCY, INITIAL_VERSION};
pub use billing_cycle::BillingCycle;
pub use capacity::{CapacityLimit, CapacityLimits, CapacityUsage, ResourceKind};
pub use errors::SubscriptionError;
pub use feature::Feature;
pub use status::SubscriptionStatus;
pub use tier::{Audience, Tier};
