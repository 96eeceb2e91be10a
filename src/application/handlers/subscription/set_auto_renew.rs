//! SetAutoRenewHandler - Turns automatic renewal on or off.

use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{ErrorCode, SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct SetAutoRenewCommand {
    pub subscription_id: SubscriptionId,
    pub auto_renew: bool,
}

pub struct SetAutoRenewHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl SetAutoRenewHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: SetAutoRenewCommand) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?
            .ok_or(SubscriptionError::not_found(cmd.subscription_id))?;

        if subscription.auto_renew == cmd.auto_renew {
            return Ok(subscription);
        }

        subscription
            .set_auto_renew(cmd.auto_renew, Timestamp::now())
            .map_err(|e| match e.code {
                ErrorCode::SubscriptionInactive => SubscriptionError::inactive(cmd.subscription_id),
                _ => SubscriptionError::from(e),
            })?;

        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            auto_renew = subscription.auto_renew,
            "auto-renew updated"
        );

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::OwnerId;
    use crate::domain::subscription::{BillingCycle, PaidTerms, Tier};

    fn subscription() -> Subscription {
        Subscription::start_paid(
            SubscriptionId::new(),
            OwnerId::new("school-40").unwrap(),
            Tier::SchoolSmall,
            BillingCycle::Annually,
            PaidTerms::default(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn turning_off_auto_renew_persists() {
        let sub = subscription();
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.save(&sub).await.unwrap();
        let handler = SetAutoRenewHandler::new(repo.clone());

        let updated = handler
            .handle(SetAutoRenewCommand {
                subscription_id: sub.id,
                auto_renew: false,
            })
            .await
            .unwrap();
        assert!(!updated.auto_renew);
        assert!(!repo.find_by_id(&sub.id).await.unwrap().unwrap().auto_renew);
    }

    #[tokio::test]
    async fn closed_record_is_inactive() {
        let mut sub = subscription();
        sub.cancel(Timestamp::now()).unwrap();
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.save(&sub).await.unwrap();
        let handler = SetAutoRenewHandler::new(repo);

        let err = handler
            .handle(SetAutoRenewCommand {
                subscription_id: sub.id,
                auto_renew: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Inactive(_)));
    }
}
