//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-memory repositories for tests and local development
//! - `postgres` - PostgreSQL persistence via sqlx
//! - `http` - Axum REST API

pub mod http;
pub mod memory;
pub mod postgres;

pub use http::{api_router, AppState};
pub use memory::{InMemoryCapacityUsageStore, InMemorySubscriptionRepository};
pub use postgres::{PostgresCapacityUsageStore, PostgresSubscriptionRepository};
