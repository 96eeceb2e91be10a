//! Entitlement resolver.
//!
//! Pure decision functions over a validated [`TierCatalogue`]. The resolver
//! holds no mutable state and never writes subscription status; it only
//! reads the records handed to it, so it is safe to share across tasks.
//!
//! Capacity counters are incremented by the provisioning services through
//! an atomic increment-and-check at the store
//! ([`CapacityUsageStore::try_increment`](crate::ports::CapacityUsageStore::try_increment)).
//! The resolver does not provide that guarantee.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::subscription::{
    CapacityUsage, Feature, ResourceKind, Subscription, SubscriptionStatus, Tier,
};

use super::{
    CapacityCheck, DenialReason, FeatureAccess, FeatureDenial, PlanChange, RequiredAction,
    TierCatalogue,
};

/// Answers feature and capacity questions for a subscription.
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    catalogue: Arc<TierCatalogue>,
}

impl EntitlementResolver {
    pub fn new(catalogue: Arc<TierCatalogue>) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &TierCatalogue {
        &self.catalogue
    }

    /// May the holder of `subscription` use `feature` right now?
    ///
    /// `None` and any status other than active or trialing deny with
    /// `no_active_subscription`. Otherwise the tier's feature row decides.
    pub fn has_feature_access(
        &self,
        subscription: Option<&Subscription>,
        feature: Feature,
    ) -> FeatureAccess {
        let subscription = match subscription {
            Some(subscription) => subscription,
            None => {
                return FeatureAccess::Denied(FeatureDenial {
                    reason: DenialReason::NoActiveSubscription,
                    feature,
                    current_tier: None,
                    current_tier_name: None,
                    action: RequiredAction::Subscribe,
                })
            }
        };

        let tier = subscription.tier;
        if !subscription.status.grants_access() {
            let action = match subscription.status {
                SubscriptionStatus::PastDue | SubscriptionStatus::Unpaid => {
                    RequiredAction::UpdatePayment
                }
                _ => RequiredAction::Subscribe,
            };
            return FeatureAccess::Denied(self.denial(
                DenialReason::NoActiveSubscription,
                feature,
                tier,
                action,
            ));
        }

        if self.catalogue.includes(tier, feature) {
            return FeatureAccess::Granted;
        }

        let action = self.upgrade_action(tier, feature);
        FeatureAccess::Denied(self.denial(DenialReason::NotInTier, feature, tier, action))
    }

    /// Is `usage` within the tier's cap for `resource`? Caps are inclusive.
    pub fn check_capacity(
        &self,
        usage: &CapacityUsage,
        tier: Tier,
        resource: ResourceKind,
    ) -> CapacityCheck {
        let limit = self.catalogue.limits(tier).limit_for(resource);
        CapacityCheck::evaluate(resource, usage.current(resource), limit)
    }

    /// Orders tiers by catalogue rank. Equal ranks compare `Equal`.
    pub fn compare_tiers(&self, a: Tier, b: Tier) -> Ordering {
        self.catalogue.rank(a).cmp(&self.catalogue.rank(b))
    }

    pub fn classify_change(&self, from: Tier, to: Tier) -> PlanChange {
        match self.compare_tiers(from, to) {
            Ordering::Less => PlanChange::Upgrade,
            Ordering::Greater => PlanChange::Downgrade,
            Ordering::Equal => PlanChange::Lateral,
        }
    }

    /// Cheapest purchasable tier, ranked at least as high as `current`,
    /// whose row includes `feature`.
    ///
    /// Ties on rank prefer the current tier's audience, then declaration
    /// order.
    pub fn suggested_upgrade(&self, current: Tier, feature: Feature) -> Option<Tier> {
        let current_rank = self.catalogue.rank(current);
        let audience = current.audience();
        self.catalogue
            .tiers_by_rank()
            .into_iter()
            .filter(|entry| {
                entry.tier != current
                    && entry.purchasable
                    && entry.rank >= current_rank
                    && entry.includes(feature)
            })
            .min_by_key(|entry| (entry.rank, entry.tier.audience() != audience, entry.tier))
            .map(|entry| entry.tier)
    }

    fn upgrade_action(&self, current: Tier, feature: Feature) -> RequiredAction {
        match self.suggested_upgrade(current, feature) {
            Some(to) => match self.catalogue.entry(to) {
                Some(entry) if !entry.sales_led => RequiredAction::Upgrade {
                    to,
                    display_name: entry.display_name.clone(),
                },
                _ => RequiredAction::ContactSales { suggested: Some(to) },
            },
            None => RequiredAction::ContactSales { suggested: None },
        }
    }

    fn denial(
        &self,
        reason: DenialReason,
        feature: Feature,
        tier: Tier,
        action: RequiredAction,
    ) -> FeatureDenial {
        FeatureDenial {
            reason,
            feature,
            current_tier: Some(tier),
            current_tier_name: Some(self.catalogue.display_name(tier).to_string()),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OwnerId, SubscriptionId, Timestamp};
    use crate::domain::subscription::{BillingCycle, CapacityLimit, PaidTerms};

    fn resolver() -> EntitlementResolver {
        EntitlementResolver::new(Arc::new(TierCatalogue::builtin().unwrap()))
    }

    fn owner() -> OwnerId {
        OwnerId::new("school-001").unwrap()
    }

    fn active(tier: Tier) -> Subscription {
        Subscription::start_paid(
            SubscriptionId::new(),
            owner(),
            tier,
            BillingCycle::Annually,
            PaidTerms::default(),
            Timestamp::now(),
        )
        .unwrap()
    }

    fn with_status(tier: Tier, status: SubscriptionStatus) -> Subscription {
        let mut sub = active(tier);
        sub.status = status;
        sub
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Feature access
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn school_small_gets_battle_royale() {
        let sub = active(Tier::SchoolSmall);
        assert_eq!(
            resolver().has_feature_access(Some(&sub), Feature::BattleRoyale),
            FeatureAccess::Granted
        );
    }

    #[test]
    fn school_small_denied_sims_integration_with_current_tier() {
        let sub = active(Tier::SchoolSmall);
        let access = resolver().has_feature_access(Some(&sub), Feature::SimsIntegration);
        let denial = access.denial().unwrap();
        assert_eq!(denial.reason, DenialReason::NotInTier);
        assert_eq!(denial.current_tier, Some(Tier::SchoolSmall));
        assert_eq!(denial.current_tier_name.as_deref(), Some("Small School"));
    }

    #[test]
    fn school_small_is_offered_large_school_for_sims() {
        let sub = active(Tier::SchoolSmall);
        let access = resolver().has_feature_access(Some(&sub), Feature::SimsIntegration);
        assert_eq!(
            access.denial().unwrap().action,
            RequiredAction::Upgrade {
                to: Tier::SchoolLarge,
                display_name: "Large School".to_string(),
            }
        );
    }

    #[test]
    fn no_subscription_is_denied_with_subscribe() {
        for feature in Feature::ALL {
            let access = resolver().has_feature_access(None, feature);
            let denial = access.denial().unwrap();
            assert_eq!(denial.reason, DenialReason::NoActiveSubscription);
            assert_eq!(denial.current_tier, None);
            assert_eq!(denial.action, RequiredAction::Subscribe);
        }
    }

    #[test]
    fn trialing_follows_tier_row() {
        let sub = with_status(Tier::Trial, SubscriptionStatus::Trialing);
        let resolver = resolver();
        assert!(resolver
            .has_feature_access(Some(&sub), Feature::BattleRoyale)
            .is_granted());
        assert!(resolver
            .has_feature_access(Some(&sub), Feature::ApiAccess)
            .is_denied());
    }

    #[test]
    fn past_due_asks_for_payment_update() {
        let sub = with_status(Tier::LaTier3, SubscriptionStatus::PastDue);
        let access = resolver().has_feature_access(Some(&sub), Feature::Certificates);
        let denial = access.denial().unwrap();
        assert_eq!(denial.reason, DenialReason::NoActiveSubscription);
        assert_eq!(denial.action, RequiredAction::UpdatePayment);
    }

    #[test]
    fn cancelled_asks_to_subscribe() {
        let sub = with_status(Tier::LaTier3, SubscriptionStatus::Cancelled);
        let access = resolver().has_feature_access(Some(&sub), Feature::Certificates);
        assert_eq!(access.denial().unwrap().action, RequiredAction::Subscribe);
    }

    #[test]
    fn sales_led_target_yields_contact_sales() {
        // Priority support first appears on sales-led tiers.
        let sub = active(Tier::MatMedium);
        let access = resolver().has_feature_access(Some(&sub), Feature::PrioritySupport);
        assert!(matches!(
            access.denial().unwrap().action,
            RequiredAction::ContactSales { suggested: Some(_) }
        ));
    }

    #[test]
    fn top_tiers_have_no_upgrade_and_sales_led_targets_contact_sales() {
        let sub = active(Tier::ResearchPartnership);
        let resolver = resolver();
        assert_eq!(resolver.suggested_upgrade(Tier::LaTier3, Feature::Sso), None);
        let access = resolver.has_feature_access(Some(&sub), Feature::SimsIntegration);
        let action = &access.denial().unwrap().action;
        assert!(matches!(action, RequiredAction::ContactSales { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Capacity
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn usage_at_limit_is_within_limit() {
        let resolver = resolver();
        let limit = resolver.catalogue().limits(Tier::SchoolSmall).max_students;
        let max = limit.max().unwrap();
        let usage = CapacityUsage::empty(owner()).with(ResourceKind::Students, max);
        let check = resolver.check_capacity(&usage, Tier::SchoolSmall, ResourceKind::Students);
        assert!(check.within_limit);
        assert_eq!(check.current, max);
        assert_eq!(check.limit, CapacityLimit::Limited(max));
    }

    #[test]
    fn usage_one_over_limit_is_not_within_limit() {
        let resolver = resolver();
        let max = resolver
            .catalogue()
            .limits(Tier::SchoolSmall)
            .max_students
            .max()
            .unwrap();
        let usage = CapacityUsage::empty(owner()).with(ResourceKind::Students, max + 1);
        let check = resolver.check_capacity(&usage, Tier::SchoolSmall, ResourceKind::Students);
        assert!(!check.within_limit);
    }

    #[test]
    fn unlimited_tier_passes_any_usage() {
        let usage = CapacityUsage::empty(owner()).with(ResourceKind::Users, u32::MAX);
        let check = resolver().check_capacity(&usage, Tier::LaTier3, ResourceKind::Users);
        assert!(check.within_limit);
        assert_eq!(check.limit, CapacityLimit::Unlimited);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tier ordering
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn compare_tiers_is_reflexive() {
        let resolver = resolver();
        for tier in Tier::ALL {
            assert_eq!(resolver.compare_tiers(tier, tier), Ordering::Equal);
        }
    }

    #[test]
    fn equal_rank_across_audiences_is_lateral() {
        let resolver = resolver();
        assert_eq!(
            resolver.compare_tiers(Tier::SchoolSmall, Tier::ResearchIndividual),
            Ordering::Equal
        );
        assert_eq!(
            resolver.classify_change(Tier::SchoolSmall, Tier::ResearchIndividual),
            PlanChange::Lateral
        );
    }

    #[test]
    fn classify_change_detects_direction() {
        let resolver = resolver();
        assert_eq!(
            resolver.classify_change(Tier::SchoolSmall, Tier::MatSmall),
            PlanChange::Upgrade
        );
        assert_eq!(
            resolver.classify_change(Tier::LaTier2, Tier::LaTier1),
            PlanChange::Downgrade
        );
    }

    #[test]
    fn suggested_upgrade_prefers_same_audience_on_ties() {
        // research_institutional and school_large share a rank.
        let resolver = resolver();
        assert_eq!(
            resolver.suggested_upgrade(Tier::ResearchIndividual, Feature::Sso),
            Some(Tier::ResearchInstitutional)
        );
        assert_eq!(
            resolver.suggested_upgrade(Tier::SchoolSmall, Feature::Sso),
            Some(Tier::SchoolLarge)
        );
    }

    #[test]
    fn suggested_upgrade_never_offers_unpurchasable_tiers() {
        let resolver = resolver();
        for feature in Feature::ALL {
            if let Some(tier) = resolver.suggested_upgrade(Tier::Trial, feature) {
                assert!(resolver.catalogue().entry(tier).unwrap().purchasable);
            }
        }
    }
}
