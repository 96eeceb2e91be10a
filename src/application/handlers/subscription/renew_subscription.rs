//! RenewSubscriptionHandler - Extends an active plan by one billing period.

use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{ErrorCode, SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct RenewSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone)]
pub struct RenewSubscriptionResult {
    pub subscription: Subscription,
    pub previous_period_end: Timestamp,
}

pub struct RenewSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl RenewSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - `Inactive` unless the record is active
    pub async fn handle(
        &self,
        cmd: RenewSubscriptionCommand,
    ) -> Result<RenewSubscriptionResult, SubscriptionError> {
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?
            .ok_or(SubscriptionError::not_found(cmd.subscription_id))?;

        let previous_period_end = subscription.current_period_end;
        subscription.renew(Timestamp::now()).map_err(|e| {
            if e.code == ErrorCode::SubscriptionInactive {
                SubscriptionError::inactive(cmd.subscription_id)
            } else {
                SubscriptionError::from(e)
            }
        })?;

        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            owner_id = %subscription.owner_id,
            period_end = %subscription.current_period_end.as_datetime(),
            "subscription renewed"
        );

        Ok(RenewSubscriptionResult {
            subscription,
            previous_period_end,
        })
    }
}
