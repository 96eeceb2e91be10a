//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod entitlement;
pub mod subscription;

pub use entitlement::{
    CheckCapacityHandler, CheckCapacityQuery, CheckCapacityResult, CheckFeatureAccessHandler,
    CheckFeatureAccessQuery, CheckFeatureAccessResult, EntitlementSummary, GetEntitlementsHandler,
    GetEntitlementsQuery, ReleaseCapacityCommand,
    ReleaseCapacityHandler, ReserveCapacityCommand, ReserveCapacityHandler, ReserveCapacityResult,
};
pub use subscription::{
    BillingEvent, ChangePlanCommand, ChangePlanHandler, ChangePlanResult,
    ListSubscriptionsHandler, ListSubscriptionsQuery, RenewSubscriptionCommand,
    RenewSubscriptionHandler, RenewSubscriptionResult, SetAutoRenewCommand, SetAutoRenewHandler,
    StartKind, StartSubscriptionCommand, StartSubscriptionHandler, StartSubscriptionResult,
    TransitionStatusCommand, TransitionStatusHandler, TransitionStatusResult,
};
