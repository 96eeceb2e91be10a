//! Entitlement query handlers.
//!
//! Read-side handlers that answer "may this owner do X?" for the rest of
//! the platform, plus the reservation pair used when provisioning seats.

mod check_capacity;
mod check_feature_access;
mod get_entitlements;
mod reserve_capacity;

pub use check_capacity::{CheckCapacityHandler, CheckCapacityQuery, CheckCapacityResult};
pub use check_feature_access::{
    CheckFeatureAccessHandler, CheckFeatureAccessQuery, CheckFeatureAccessResult,
};
pub use get_entitlements::{EntitlementSummary, GetEntitlementsHandler, GetEntitlementsQuery};
pub use reserve_capacity::{
    ReleaseCapacityCommand, ReleaseCapacityHandler, ReserveCapacityCommand,
    ReserveCapacityHandler, ReserveCapacityResult,
};
