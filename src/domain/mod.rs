//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine)
//! - `subscription` - Plan records, tiers, features and capacity
//! - `entitlement` - Tier catalogue and the entitlement resolver

pub mod entitlement;
pub mod foundation;
pub mod subscription;
