//! PostgreSQL adapters.
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!` at
//! startup.

mod capacity_usage_store;
mod subscription_repository;

pub use capacity_usage_store::PostgresCapacityUsageStore;
pub use subscription_repository::PostgresSubscriptionRepository;
