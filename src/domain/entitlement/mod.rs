//! Entitlement domain module.
//!
//! The tier catalogue and the resolver that answers "may this owner use
//! this feature?" and "is this owner within capacity?".

mod access;
mod catalogue;
mod resolver;

pub use access::{
    CapacityCheck, DenialReason, FeatureAccess, FeatureDenial, PlanChange, RequiredAction,
};
pub use catalogue::{CatalogueError, TierCatalogue, TierEntry, DEFAULT_CATALOGUE_YAML};
pub use resolver::EntitlementResolver;
