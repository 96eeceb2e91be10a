//! HTTP adapter for entitlement endpoints.
//!
//! Exposes the resolver to the rest of the platform:
//! - `GET /api/entitlements` - Everything the owner may use
//! - `GET /api/entitlements/features/:feature` - Feature gate
//! - `GET /api/entitlements/capacity/:resource` - Capacity gate
//! - `POST /api/entitlements/capacity/:resource/{reserve,release}` - Seat accounting
//! - `GET /api/entitlements/tiers` - Catalogue listing

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{OwnerContext, OWNER_HEADER};
pub use routes::entitlement_routes;
