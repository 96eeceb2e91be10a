//! In-memory capacity usage store.
//!
//! Counters live behind a single `Mutex`, which makes the check and the
//! increment in `try_increment` one atomic step.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, OwnerId};
use crate::domain::subscription::{CapacityLimit, CapacityUsage, ResourceKind};
use crate::ports::{CapacityUsageStore, Reservation};

#[derive(Debug, Clone, Default)]
pub struct InMemoryCapacityUsageStore {
    usage: Arc<Mutex<HashMap<OwnerId, CapacityUsage>>>,
}

impl InMemoryCapacityUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an owner's counters (seeding for tests and demos).
    pub async fn set_usage(&self, usage: CapacityUsage) {
        self.usage.lock().await.insert(usage.owner_id.clone(), usage);
    }
}

#[async_trait]
impl CapacityUsageStore for InMemoryCapacityUsageStore {
    async fn get_usage(&self, owner_id: &OwnerId) -> Result<CapacityUsage, DomainError> {
        Ok(self
            .usage
            .lock()
            .await
            .get(owner_id)
            .cloned()
            .unwrap_or_else(|| CapacityUsage::empty(owner_id.clone())))
    }

    async fn try_increment(
        &self,
        owner_id: &OwnerId,
        resource: ResourceKind,
        limit: CapacityLimit,
    ) -> Result<Reservation, DomainError> {
        let mut usage = self.usage.lock().await;
        let entry = usage
            .entry(owner_id.clone())
            .or_insert_with(|| CapacityUsage::empty(owner_id.clone()));
        let counter = entry.counter_mut(resource);
        let current = *counter;
        match current.checked_add(1) {
            Some(next) if limit.has_room_for_one_more(current) => {
                *counter = next;
                Ok(Reservation::Reserved { current: next })
            }
            _ => Ok(Reservation::Refused { current }),
        }
    }

    async fn decrement(&self, owner_id: &OwnerId, resource: ResourceKind) -> Result<(), DomainError> {
        let mut usage = self.usage.lock().await;
        if let Some(entry) = usage.get_mut(owner_id) {
            let counter = entry.counter_mut(resource);
            *counter = counter.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("school-9").unwrap()
    }

    #[tokio::test]
    async fn unknown_owner_has_zero_usage() {
        let store = InMemoryCapacityUsageStore::new();
        let usage = store.get_usage(&owner()).await.unwrap();
        assert_eq!(usage, CapacityUsage::empty(owner()));
    }

    #[tokio::test]
    async fn increments_up_to_cap_then_refuses() {
        let store = InMemoryCapacityUsageStore::new();
        let limit = CapacityLimit::Limited(2);

        let first = store.try_increment(&owner(), ResourceKind::Students, limit).await.unwrap();
        assert_eq!(first, Reservation::Reserved { current: 1 });
        let second = store.try_increment(&owner(), ResourceKind::Students, limit).await.unwrap();
        assert_eq!(second, Reservation::Reserved { current: 2 });
        let third = store.try_increment(&owner(), ResourceKind::Students, limit).await.unwrap();
        assert_eq!(third, Reservation::Refused { current: 2 });

        let usage = store.get_usage(&owner()).await.unwrap();
        assert_eq!(usage.current_students, 2);
    }

    #[tokio::test]
    async fn concurrent_increments_never_exceed_cap() {
        let store = InMemoryCapacityUsageStore::new();
        let limit = CapacityLimit::Limited(10);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .try_increment(&owner(), ResourceKind::Users, limit)
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_reserved() {
                granted += 1;
            }
        }

        assert_eq!(granted, 10);
        assert_eq!(store.get_usage(&owner()).await.unwrap().current_users, 10);
    }

    #[tokio::test]
    async fn decrement_saturates_at_zero() {
        let store = InMemoryCapacityUsageStore::new();
        store.decrement(&owner(), ResourceKind::Schools).await.unwrap();
        store
            .set_usage(CapacityUsage::empty(owner()).with(ResourceKind::Schools, 1))
            .await;
        store.decrement(&owner(), ResourceKind::Schools).await.unwrap();
        store.decrement(&owner(), ResourceKind::Schools).await.unwrap();
        assert_eq!(store.get_usage(&owner()).await.unwrap().current_schools, 0);
    }

    #[tokio::test]
    async fn unlimited_always_increments() {
        let store = InMemoryCapacityUsageStore::new();
        store
            .set_usage(CapacityUsage::empty(owner()).with(ResourceKind::Users, u32::MAX - 1))
            .await;
        let result = store
            .try_increment(&owner(), ResourceKind::Users, CapacityLimit::Unlimited)
            .await
            .unwrap();
        assert_eq!(result, Reservation::Reserved { current: u32::MAX });
    }

    #[tokio::test]
    async fn full_counter_refuses_even_when_unlimited() {
        let store = InMemoryCapacityUsageStore::new();
        store
            .set_usage(CapacityUsage::empty(owner()).with(ResourceKind::Users, u32::MAX))
            .await;
        let result = store
            .try_increment(&owner(), ResourceKind::Users, CapacityLimit::Unlimited)
            .await
            .unwrap();
        assert_eq!(result, Reservation::Refused { current: u32::MAX });
        assert_eq!(store.get_usage(&owner()).await.unwrap().current_users, u32::MAX);
    }
}
