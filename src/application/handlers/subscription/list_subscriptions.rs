//! ListSubscriptionsHandler - Query handler for subscription history.
//!
//! Used by the billing and admin surfaces. Page size is clamped so a
//! caller cannot ask for the whole table.

use std::sync::Arc;

use crate::domain::subscription::SubscriptionError;
use crate::ports::{ListOptions, SubscriptionPage, SubscriptionRepository};

/// Page size when the caller does not give one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct ListSubscriptionsQuery {
    pub options: ListOptions,
}

pub struct ListSubscriptionsHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl ListSubscriptionsHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: ListSubscriptionsQuery,
    ) -> Result<SubscriptionPage, SubscriptionError> {
        let mut options = query.options;
        options.limit = Some(
            options
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        );

        self.repository
            .list(&options)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::{OwnerId, SubscriptionId, Timestamp};
    use crate::domain::subscription::{BillingCycle, Subscription, Tier};

    async fn repo_with_owners(count: usize) -> Arc<InMemorySubscriptionRepository> {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        for i in 0..count {
            let sub = Subscription::start_trial(
                SubscriptionId::new(),
                OwnerId::new(format!("school-{}", i)).unwrap(),
                Tier::Trial,
                BillingCycle::Monthly,
                30,
                Timestamp::now(),
            );
            repo.save(&sub).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn default_page_size_applies() {
        let handler = ListSubscriptionsHandler::new(repo_with_owners(25).await);
        let page = handler.handle(ListSubscriptionsQuery::default()).await.unwrap();
        assert_eq!(page.items.len(), DEFAULT_PAGE_SIZE as usize);
        assert_eq!(page.total, 25);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn oversized_page_is_clamped() {
        let handler = ListSubscriptionsHandler::new(repo_with_owners(3).await);
        let page = handler
            .handle(ListSubscriptionsQuery {
                options: ListOptions::paginated(1, 10_000),
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn owner_filter_narrows_results() {
        let handler = ListSubscriptionsHandler::new(repo_with_owners(5).await);
        let page = handler
            .handle(ListSubscriptionsQuery {
                options: ListOptions::default().for_owner(OwnerId::new("school-3").unwrap()),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].owner_id.as_str(), "school-3");
    }
}
