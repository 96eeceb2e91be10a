//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the error
//! types shared by the subscription and entitlement modules.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OwnerId, SubscriptionId};
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
