//! Subscription repository port.
//!
//! Defines the contract for persisting and retrieving Subscription records.
//!
//! # Design
//!
//! - **No deletes**: closed records stay for audit and churn analysis
//! - **One current record per owner**: `save` and `supersede` must reject
//!   a second non-terminal record for the same owner
//! - **Atomic plan change**: `supersede` writes the closed record and its
//!   replacement together or not at all
//!
//! # Example
//!
//! ```ignore
//! async fn change_plan(
//!     repo: &dyn SubscriptionRepository,
//!     owner_id: &OwnerId,
//!     tier: Tier,
//! ) -> Result<Subscription, DomainError> {
//!     let mut current = repo
//!         .find_active_by_owner(owner_id)
//!         .await?
//!         .ok_or_else(|| DomainError::new(ErrorCode::SubscriptionNotFound, "none"))?;
//!     let replacement = current.supersede(
//!         SubscriptionId::new(), tier, current.billing_cycle, None, Timestamp::now(),
//!     )?;
//!     repo.supersede(&current, &replacement).await?;
//!     Ok(replacement)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, OwnerId, SubscriptionId};
use crate::domain::subscription::{Subscription, SubscriptionStatus, Tier};

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a record by its ID. Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find the owner's current (non-terminal) record.
    ///
    /// Returns `None` if the owner has no current plan.
    async fn find_active_by_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the record is current and the owner already
    ///   has a current record
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing record.
    ///
    /// The write only applies if the stored record is still current and
    /// still at `subscription.version`; the stored version then advances
    /// by one.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `InvalidStateTransition` if the stored record is already closed
    /// - `ConcurrencyConflict` if the stored version differs
    /// - `SubscriptionExists` if the write would give the owner a second
    ///   current record
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Persist a closed record and its replacement atomically.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `closed` is still current or the two records
    ///   belong to different owners
    /// - `SubscriptionNotFound` if `closed` was never saved
    /// - `InvalidStateTransition` or `ConcurrencyConflict` if the stored
    ///   copy of `closed` is closed already or at another version
    /// - `SubscriptionExists` if another current record exists for the owner
    async fn supersede(
        &self,
        closed: &Subscription,
        opened: &Subscription,
    ) -> Result<(), DomainError>;

    /// List records matching `options`.
    async fn list(&self, options: &ListOptions) -> Result<SubscriptionPage, DomainError>;
}

/// Sort key for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    StartedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Filter, sort and pagination for listing subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Maximum number of results to return.
    pub limit: Option<u32>,

    /// Number of results to skip.
    pub offset: Option<u32>,

    pub owner_id: Option<OwnerId>,
    pub tier: Option<Tier>,
    pub status: Option<SubscriptionStatus>,

    /// Only records that are still current.
    pub current_only: bool,

    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl ListOptions {
    /// Create options for a paginated query (pages start at 1).
    pub fn paginated(page: u32, per_page: u32) -> Self {
        Self {
            limit: Some(per_page),
            offset: Some(page.saturating_sub(1).saturating_mul(per_page)),
            ..Self::default()
        }
    }

    pub fn for_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn current_only(mut self) -> Self {
        self.current_only = true;
        self
    }

    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_by = field;
        self.direction = direction;
        self
    }

    /// Returns true if `subscription` passes every filter.
    pub fn matches(&self, subscription: &Subscription) -> bool {
        self.owner_id
            .as_ref()
            .map_or(true, |owner| &subscription.owner_id == owner)
            && self.tier.map_or(true, |tier| subscription.tier == tier)
            && self.status.map_or(true, |status| subscription.status == status)
            && (!self.current_only || subscription.is_current())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPage {
    pub items: Vec<Subscription>,

    /// Total number of matching records across all pages.
    pub total: u64,

    pub has_more: bool,
}
