//! Shared application state for the HTTP adapters.

use std::sync::Arc;

use crate::application::handlers::{
    ChangePlanHandler, CheckCapacityHandler, CheckFeatureAccessHandler, GetEntitlementsHandler,
    ListSubscriptionsHandler, ReleaseCapacityHandler, RenewSubscriptionHandler,
    ReserveCapacityHandler, SetAutoRenewHandler, StartSubscriptionHandler,
    TransitionStatusHandler,
};
use crate::domain::entitlement::EntitlementResolver;
use crate::ports::{CapacityUsageStore, SubscriptionRepository};

/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub subscription_repository: Arc<dyn SubscriptionRepository>,
    pub usage_store: Arc<dyn CapacityUsageStore>,
    pub resolver: EntitlementResolver,
}

impl AppState {
    pub fn new(
        subscription_repository: Arc<dyn SubscriptionRepository>,
        usage_store: Arc<dyn CapacityUsageStore>,
        resolver: EntitlementResolver,
    ) -> Self {
        Self {
            subscription_repository,
            usage_store,
            resolver,
        }
    }

    pub fn check_feature_access_handler(&self) -> CheckFeatureAccessHandler {
        CheckFeatureAccessHandler::new(self.subscription_repository.clone(), self.resolver.clone())
    }

    pub fn check_capacity_handler(&self) -> CheckCapacityHandler {
        CheckCapacityHandler::new(
            self.subscription_repository.clone(),
            self.usage_store.clone(),
            self.resolver.clone(),
        )
    }

    pub fn get_entitlements_handler(&self) -> GetEntitlementsHandler {
        GetEntitlementsHandler::new(self.subscription_repository.clone(), self.resolver.clone())
    }

    pub fn reserve_capacity_handler(&self) -> ReserveCapacityHandler {
        ReserveCapacityHandler::new(
            self.subscription_repository.clone(),
            self.usage_store.clone(),
            self.resolver.clone(),
        )
    }

    pub fn release_capacity_handler(&self) -> ReleaseCapacityHandler {
        ReleaseCapacityHandler::new(self.usage_store.clone())
    }

    pub fn start_subscription_handler(&self) -> StartSubscriptionHandler {
        StartSubscriptionHandler::new(self.subscription_repository.clone(), self.resolver.clone())
    }

    pub fn change_plan_handler(&self) -> ChangePlanHandler {
        ChangePlanHandler::new(self.subscription_repository.clone(), self.resolver.clone())
    }

    pub fn transition_status_handler(&self) -> TransitionStatusHandler {
        TransitionStatusHandler::new(self.subscription_repository.clone())
    }

    pub fn renew_subscription_handler(&self) -> RenewSubscriptionHandler {
        RenewSubscriptionHandler::new(self.subscription_repository.clone())
    }

    pub fn set_auto_renew_handler(&self) -> SetAutoRenewHandler {
        SetAutoRenewHandler::new(self.subscription_repository.clone())
    }

    pub fn list_subscriptions_handler(&self) -> ListSubscriptionsHandler {
        ListSubscriptionsHandler::new(self.subscription_repository.clone())
    }
}
