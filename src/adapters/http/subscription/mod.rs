//! HTTP adapter for subscription lifecycle endpoints.
//!
//! The billing integration drives every status change through these
//! routes; the entitlement endpoints only ever read what they write.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::subscription_routes;
