//! Subscription lifecycle handlers.
//!
//! Commands issued by the billing integration and the admin surface. Each
//! loads the owner's record, applies one domain operation and saves it.

mod change_plan;
mod list_subscriptions;
mod renew_subscription;
mod set_auto_renew;
mod start_subscription;
mod transition_status;

pub use change_plan::{ChangePlanCommand, ChangePlanHandler, ChangePlanResult};
pub use list_subscriptions::{
    ListSubscriptionsHandler, ListSubscriptionsQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use renew_subscription::{
    RenewSubscriptionCommand, RenewSubscriptionHandler, RenewSubscriptionResult,
};
pub use set_auto_renew::{SetAutoRenewCommand, SetAutoRenewHandler};
pub use start_subscription::{
    StartKind, StartSubscriptionCommand, StartSubscriptionHandler, StartSubscriptionResult,
    DEFAULT_TRIAL_DAYS,
};
pub use transition_status::{
    BillingEvent, TransitionStatusCommand, TransitionStatusHandler, TransitionStatusResult,
};
