//! In-memory adapters for development and tests.

mod in_memory_capacity_usage_store;
mod in_memory_subscription_repository;

pub use in_memory_capacity_usage_store::InMemoryCapacityUsageStore;
pub use in_memory_subscription_repository::InMemorySubscriptionRepository;
