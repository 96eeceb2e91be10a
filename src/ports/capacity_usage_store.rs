//! Capacity usage port.
//!
//! Usage counters are written by the provisioning and enrollment services
//! and read by the entitlement checks. Increments must be atomic at the
//! store: two concurrent "add a student" requests for the same owner must
//! not both succeed past the cap.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OwnerId};
use crate::domain::subscription::{CapacityLimit, CapacityUsage, ResourceKind};

/// Outcome of [`CapacityUsageStore::try_increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// A unit was taken. `current` includes it.
    Reserved { current: u32 },
    /// Nothing changed. `current` is the count that blocked the increment.
    Refused { current: u32 },
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }

    /// Counter value after the attempt.
    pub fn current(&self) -> u32 {
        match self {
            Reservation::Reserved { current } | Reservation::Refused { current } => *current,
        }
    }
}

/// Store for per-owner capacity counters.
#[async_trait]
pub trait CapacityUsageStore: Send + Sync {
    /// Current counters for an owner. Owners never seen report zero usage.
    async fn get_usage(&self, owner_id: &OwnerId) -> Result<CapacityUsage, DomainError>;

    /// Add one unit of `resource` if doing so stays within `limit`.
    ///
    /// Returns `Refused` (and changes nothing) when the owner is already at
    /// the cap or the counter cannot grow further. The check and the
    /// increment happen as one atomic step, and the returned count is the
    /// one that step produced.
    async fn try_increment(
        &self,
        owner_id: &OwnerId,
        resource: ResourceKind,
        limit: CapacityLimit,
    ) -> Result<Reservation, DomainError>;

    /// Remove one unit of `resource`. Saturates at zero.
    async fn decrement(&self, owner_id: &OwnerId, resource: ResourceKind)
        -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_reports_count_either_way() {
        let taken = Reservation::Reserved { current: 4 };
        let refused = Reservation::Refused { current: 5 };
        assert!(taken.is_reserved());
        assert!(!refused.is_reserved());
        assert_eq!(taken.current(), 4);
        assert_eq!(refused.current(), 5);
    }

    #[test]
    fn capacity_usage_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn CapacityUsageStore) {}
    }
}
