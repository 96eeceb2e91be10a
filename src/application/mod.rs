//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).
//! Entitlement queries never fail outward: storage errors become denials.

pub mod handlers;

pub use handlers::*;
