//! TransitionStatusHandler - Applies billing lifecycle events.
//!
//! The billing provider reports what happened; this handler decides which
//! transition that means for the record and persists it. Events that do not
//! fit the record's current status are rejected with `InvalidState`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionError, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// Lifecycle events reported by the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEvent {
    /// A charge went through. Recovers a past-due plan or renews an active one.
    PaymentSucceeded,
    PaymentFailed,
    /// Retries are exhausted.
    GracePeriodExhausted,
    TrialConverted,
    TrialEndedWithoutPayment,
    Cancelled,
}

impl BillingEvent {
    pub const ALL: [BillingEvent; 6] = [
        BillingEvent::PaymentSucceeded,
        BillingEvent::PaymentFailed,
        BillingEvent::GracePeriodExhausted,
        BillingEvent::TrialConverted,
        BillingEvent::TrialEndedWithoutPayment,
        BillingEvent::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingEvent::PaymentSucceeded => "payment_succeeded",
            BillingEvent::PaymentFailed => "payment_failed",
            BillingEvent::GracePeriodExhausted => "grace_period_exhausted",
            BillingEvent::TrialConverted => "trial_converted",
            BillingEvent::TrialEndedWithoutPayment => "trial_ended_without_payment",
            BillingEvent::Cancelled => "cancelled",
        }
    }

    /// Apply this event to `subscription`.
    fn apply(&self, subscription: &mut Subscription, at: Timestamp) -> Result<(), SubscriptionError> {
        match self {
            BillingEvent::PaymentSucceeded => match subscription.status {
                SubscriptionStatus::PastDue => subscription.recover_payment(at)?,
                SubscriptionStatus::Active => subscription.renew(at)?,
                other => {
                    return Err(SubscriptionError::invalid_state(format!(
                        "Payment succeeded for subscription in {} state",
                        other
                    )))
                }
            },
            BillingEvent::PaymentFailed => subscription.mark_past_due(at)?,
            BillingEvent::GracePeriodExhausted => subscription.mark_unpaid(at)?,
            BillingEvent::TrialConverted => subscription.activate(at)?,
            BillingEvent::TrialEndedWithoutPayment => subscription.expire_trial(at)?,
            BillingEvent::Cancelled => subscription.cancel(at)?,
        }
        Ok(())
    }
}

impl fmt::Display for BillingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BillingEvent {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillingEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| SubscriptionError::validation("event", format!("Unknown billing event: {}", s)))
    }
}

#[derive(Debug, Clone)]
pub struct TransitionStatusCommand {
    pub subscription_id: SubscriptionId,
    pub event: BillingEvent,
    /// When the provider says the event happened.
    pub occurred_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct TransitionStatusResult {
    pub subscription: Subscription,
    pub previous_status: SubscriptionStatus,
}

pub struct TransitionStatusHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl TransitionStatusHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - `InvalidState` if the event does not apply to the current status
    pub async fn handle(
        &self,
        cmd: TransitionStatusCommand,
    ) -> Result<TransitionStatusResult, SubscriptionError> {
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(|e| SubscriptionError::infrastructure(e.to_string()))?
            .ok_or(SubscriptionError::not_found(cmd.subscription_id))?;

        let previous_status = subscription.status;
        cmd.event.apply(&mut subscription, cmd.occurred_at)?;

        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            owner_id = %subscription.owner_id,
            event = %cmd.event,
            from = %previous_status,
            to = %subscription.status,
            "subscription status changed"
        );

        Ok(TransitionStatusResult {
            subscription,
            previous_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::{ErrorCode, OwnerId};
    use crate::domain::subscription::{BillingCycle, PaidTerms, Tier};

    fn owner() -> OwnerId {
        OwnerId::new("la-3").unwrap()
    }

    fn active() -> Subscription {
        Subscription::start_paid(
            SubscriptionId::new(),
            owner(),
            Tier::LaTier1,
            BillingCycle::Monthly,
            PaidTerms::default(),
            Timestamp::now(),
        )
        .unwrap()
    }

    fn trialing() -> Subscription {
        Subscription::start_trial(
            SubscriptionId::new(),
            owner(),
            Tier::Trial,
            BillingCycle::Monthly,
            30,
            Timestamp::now(),
        )
    }

    async fn setup(sub: &Subscription) -> (Arc<InMemorySubscriptionRepository>, TransitionStatusHandler) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        repo.save(sub).await.unwrap();
        let handler = TransitionStatusHandler::new(repo.clone());
        (repo, handler)
    }

    fn event(sub: &Subscription, event: BillingEvent) -> TransitionStatusCommand {
        TransitionStatusCommand {
            subscription_id: sub.id,
            event,
            occurred_at: Timestamp::now(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event names
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn event_names_round_trip() {
        for e in BillingEvent::ALL {
            assert_eq!(e.as_str().parse::<BillingEvent>().unwrap(), e);
            assert_eq!(serde_json::to_string(&e).unwrap(), format!("\"{}\"", e.as_str()));
        }
        assert!("refunded".parse::<BillingEvent>().is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payment path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_then_recovered_payment() {
        let sub = active();
        let (repo, handler) = setup(&sub).await;

        let failed = handler.handle(event(&sub, BillingEvent::PaymentFailed)).await.unwrap();
        assert_eq!(failed.previous_status, SubscriptionStatus::Active);
        assert_eq!(failed.subscription.status, SubscriptionStatus::PastDue);

        let recovered = handler.handle(event(&sub, BillingEvent::PaymentSucceeded)).await.unwrap();
        assert_eq!(recovered.subscription.status, SubscriptionStatus::Active);

        let stored = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn payment_on_active_plan_extends_period() {
        let sub = active();
        let (_repo, handler) = setup(&sub).await;
        let result = handler.handle(event(&sub, BillingEvent::PaymentSucceeded)).await.unwrap();
        assert!(result.subscription.current_period_end > sub.current_period_end);
    }

    #[tokio::test]
    async fn exhausted_grace_period_marks_unpaid() {
        let sub = active();
        let (_repo, handler) = setup(&sub).await;
        handler.handle(event(&sub, BillingEvent::PaymentFailed)).await.unwrap();
        let result = handler.handle(event(&sub, BillingEvent::GracePeriodExhausted)).await.unwrap();
        assert_eq!(result.subscription.status, SubscriptionStatus::Unpaid);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Trial path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn trial_converts_to_active() {
        let sub = trialing();
        let (_repo, handler) = setup(&sub).await;
        let result = handler.handle(event(&sub, BillingEvent::TrialConverted)).await.unwrap();
        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn trial_expiry_closes_record() {
        let sub = trialing();
        let (repo, handler) = setup(&sub).await;
        let result = handler
            .handle(event(&sub, BillingEvent::TrialEndedWithoutPayment))
            .await
            .unwrap();
        assert_eq!(result.subscription.status, SubscriptionStatus::TrialExpired);
        assert!(result.subscription.ended_at.is_some());
        assert!(repo.find_active_by_owner(&owner()).await.unwrap().is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_failure_during_trial_is_rejected() {
        let sub = trialing();
        let (repo, handler) = setup(&sub).await;
        let err = handler.handle(event(&sub, BillingEvent::PaymentFailed)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

        let stored = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn events_after_cancellation_are_rejected() {
        let sub = active();
        let (_repo, handler) = setup(&sub).await;
        handler.handle(event(&sub, BillingEvent::Cancelled)).await.unwrap();

        for e in BillingEvent::ALL {
            let err = handler.handle(event(&sub, e)).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidStateTransition, "event {}", e);
        }
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let handler = TransitionStatusHandler::new(Arc::new(InMemorySubscriptionRepository::new()));
        let err = handler.handle(event(&active(), BillingEvent::Cancelled)).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NotFound(_)));
    }
}
