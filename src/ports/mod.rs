//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SubscriptionRepository` - Subscription records (written by billing)
//! - `CapacityUsageStore` - Per-owner usage counters (written by provisioning)

mod capacity_usage_store;
mod subscription_repository;

pub use capacity_usage_store::{CapacityUsageStore, Reservation};
pub use subscription_repository::{
    ListOptions, SortDirection, SortField, SubscriptionPage, SubscriptionRepository,
};
