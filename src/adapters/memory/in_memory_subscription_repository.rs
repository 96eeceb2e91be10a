//! In-memory subscription repository.
//!
//! Useful for:
//! - Development without a database
//! - Handler and HTTP tests
//!
//! Does not persist data across restarts. A single `RwLock` guards the whole
//! map, so `supersede` is atomic with respect to every other call.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, SubscriptionId};
use crate::domain::subscription::Subscription;
use crate::ports::{
    ListOptions, SortDirection, SortField, SubscriptionPage, SubscriptionRepository,
};

/// In-memory storage for subscription records.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    records: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, open and closed.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every record held for an owner, oldest first.
    pub async fn history(&self, owner_id: &OwnerId) -> Vec<Subscription> {
        let records = self.records.read().await;
        let mut history: Vec<Subscription> = records
            .values()
            .filter(|s| &s.owner_id == owner_id)
            .cloned()
            .collect();
        history.sort_by_key(|s| s.created_at);
        history
    }
}

fn current_conflict(
    records: &HashMap<SubscriptionId, Subscription>,
    owner_id: &OwnerId,
    except: &[SubscriptionId],
) -> Option<SubscriptionId> {
    records
        .values()
        .find(|s| &s.owner_id == owner_id && s.is_current() && !except.contains(&s.id))
        .map(|s| s.id)
}

fn already_exists(owner_id: &OwnerId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionExists,
        format!("Owner {} already has a current subscription", owner_id),
    )
    .with_detail("owner_id", owner_id.as_str())
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
    .with_detail("subscription_id", id.to_string())
}

/// Closed records are immutable, and a write must carry the version it read.
fn check_writable(stored: &Subscription, incoming: &Subscription) -> Result<(), DomainError> {
    if !stored.is_current() {
        return Err(DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Subscription {} is already {}", stored.id, stored.status),
        )
        .with_detail("subscription_id", stored.id.to_string()));
    }
    if stored.version != incoming.version {
        return Err(DomainError::new(
            ErrorCode::ConcurrencyConflict,
            format!(
                "Subscription {} changed since it was read (version {} is now {})",
                stored.id, incoming.version, stored.version
            ),
        ));
    }
    Ok(())
}

fn next_revision(stored: &Subscription, incoming: &Subscription) -> Subscription {
    let mut next = incoming.clone();
    next.version = stored.version.saturating_add(1);
    next
}

fn compare(options: &ListOptions, a: &Subscription, b: &Subscription) -> Ordering {
    let ordering = match options.sort_by {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::StartedAt => a.started_at.cmp(&b.started_at),
    }
    .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()));
    match options.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_active_by_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<Subscription>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|s| &s.owner_id == owner_id && s.is_current())
            .cloned())
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("Subscription {} already saved", subscription.id),
            ));
        }
        if subscription.is_current()
            && current_conflict(&records, &subscription.owner_id, &[]).is_some()
        {
            return Err(already_exists(&subscription.owner_id));
        }
        records.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let stored = records
            .get(&subscription.id)
            .ok_or_else(|| not_found(&subscription.id))?;
        check_writable(stored, subscription)?;
        let next = next_revision(stored, subscription);

        if next.is_current()
            && current_conflict(&records, &next.owner_id, &[next.id]).is_some()
        {
            return Err(already_exists(&next.owner_id));
        }
        records.insert(next.id, next);
        Ok(())
    }

    async fn supersede(
        &self,
        closed: &Subscription,
        opened: &Subscription,
    ) -> Result<(), DomainError> {
        if closed.is_current() {
            return Err(DomainError::validation(
                "closed",
                "Superseded record must be closed first",
            ));
        }
        if closed.owner_id != opened.owner_id {
            return Err(DomainError::validation(
                "opened",
                "Replacement must belong to the same owner",
            ));
        }

        let mut records = self.records.write().await;
        let stored = records.get(&closed.id).ok_or_else(|| not_found(&closed.id))?;
        check_writable(stored, closed)?;
        let closed = next_revision(stored, closed);

        if records.contains_key(&opened.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("Subscription {} already saved", opened.id),
            ));
        }
        if current_conflict(&records, &opened.owner_id, &[closed.id]).is_some() {
            return Err(already_exists(&opened.owner_id));
        }

        records.insert(closed.id, closed);
        records.insert(opened.id, opened.clone());
        Ok(())
    }

    async fn list(&self, options: &ListOptions) -> Result<SubscriptionPage, DomainError> {
        let records = self.records.read().await;
        let mut matching: Vec<&Subscription> =
            records.values().filter(|s| options.matches(s)).collect();
        matching.sort_by(|a, b| compare(options, a, b));

        let total = matching.len() as u64;
        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        let items: Vec<Subscription> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = (offset as u64).saturating_add(items.len() as u64) < total;

        Ok(SubscriptionPage {
            items,
            total,
            has_more,
        })
    }
}
