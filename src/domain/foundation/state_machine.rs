//! State machine trait for lifecycle status enums.

use std::fmt;

/// Rejected transition between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Debug> fmt::Display for InvalidTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot transition from {:?} to {:?}", self.from, self.to)
    }
}

impl<S: fmt::Debug> std::error::Error for InvalidTransition<S> {}

/// Trait for status enums whose values form a state machine.
///
/// Implementors define the allowed edges; `transition_to` and `is_terminal`
/// come for free.
///
/// # Example
///
/// ```ignore
/// let next = SubscriptionStatus::PastDue.transition_to(SubscriptionStatus::Active)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation.
    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
