//! PostgreSQL implementation of SubscriptionRepository.
//!
//! The one-current-record rule is enforced by the partial unique index
//! `subscriptions_one_current_per_owner`; `supersede` closes and opens in a
//! single transaction so the index never sees two current rows.
//!
//! Updates are conditional on the row's `version` and on the row still
//! being current, so a stale copy can never overwrite a newer or closed row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, OwnerId, SubscriptionId, Timestamp};
use crate::domain::subscription::{BillingCycle, Subscription, SubscriptionStatus, Tier};
use crate::ports::{
    ListOptions, SortDirection, SortField, SubscriptionPage, SubscriptionRepository,
};

const ONE_CURRENT_INDEX: &str = "subscriptions_one_current_per_owner";

const SELECT_COLUMNS: &str = "SELECT id, owner_id, tier, status, billing_cycle, started_at, \
     current_period_end, ended_at, quantity, amount_pence, currency, auto_renew, \
     created_at, updated_at, version FROM subscriptions";

const CLOSED_STATUSES: &str = "('cancelled', 'trial_expired')";

/// PostgreSQL implementation of the SubscriptionRepository port.
#[derive(Debug, Clone)]
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    owner_id: String,
    tier: String,
    status: String,
    billing_cycle: String,
    started_at: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    quantity: Option<i64>,
    amount_pence: Option<i64>,
    currency: String,
    auto_renew: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            owner_id: OwnerId::new(row.owner_id).map_err(|e| corrupt("owner_id", e))?,
            tier: row.tier.parse::<Tier>().map_err(|e| corrupt("tier", e))?,
            status: row
                .status
                .parse::<SubscriptionStatus>()
                .map_err(|e| corrupt("status", e))?,
            billing_cycle: row
                .billing_cycle
                .parse::<BillingCycle>()
                .map_err(|e| corrupt("billing_cycle", e))?,
            started_at: Timestamp::from_datetime(row.started_at),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            ended_at: row.ended_at.map(Timestamp::from_datetime),
            quantity: row
                .quantity
                .map(u32::try_from)
                .transpose()
                .map_err(|e| corrupt("quantity", e))?,
            amount_pence: row.amount_pence,
            currency: row.currency.trim().to_string(),
            auto_renew: row.auto_renew,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: u32::try_from(row.version).map_err(|e| corrupt("version", e))?,
        })
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value in subscriptions row: {}", column, err),
    )
}

fn db_error(action: &str, owner_id: &OwnerId, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some(ONE_CURRENT_INDEX) {
            return DomainError::new(
                ErrorCode::SubscriptionExists,
                format!("Owner {} already has a current subscription", owner_id),
            )
            .with_detail("owner_id", owner_id.as_str());
        }
    }
    DomainError::database(format!("Failed to {} subscription: {}", action, e))
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, options: &ListOptions) {
    builder.push(" WHERE TRUE");
    if let Some(owner_id) = &options.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id.as_str().to_string());
    }
    if let Some(tier) = options.tier {
        builder.push(" AND tier = ").push_bind(tier.as_str());
    }
    if let Some(status) = options.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if options.current_only {
        builder.push(" AND status NOT IN ").push(CLOSED_STATUSES);
    }
}

fn order_clause(options: &ListOptions) -> &'static str {
    match (options.sort_by, options.direction) {
        (SortField::CreatedAt, SortDirection::Ascending) => " ORDER BY created_at ASC, id ASC",
        (SortField::CreatedAt, SortDirection::Descending) => " ORDER BY created_at DESC, id DESC",
        (SortField::StartedAt, SortDirection::Ascending) => " ORDER BY started_at ASC, id ASC",
        (SortField::StartedAt, SortDirection::Descending) => " ORDER BY started_at DESC, id DESC",
    }
}

async fn insert<'e, E>(executor: E, subscription: &Subscription) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, owner_id, tier, status, billing_cycle, started_at, current_period_end,
            ended_at, quantity, amount_pence, currency, auto_renew, created_at, updated_at,
            version
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.owner_id.as_str())
    .bind(subscription.tier.as_str())
    .bind(subscription.status.as_str())
    .bind(subscription.billing_cycle.as_str())
    .bind(subscription.started_at.as_datetime())
    .bind(subscription.current_period_end.as_datetime())
    .bind(subscription.ended_at.map(|t| *t.as_datetime()))
    .bind(subscription.quantity.map(i64::from))
    .bind(subscription.amount_pence)
    .bind(&subscription.currency)
    .bind(subscription.auto_renew)
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .bind(subscription.version as i32)
    .execute(executor)
    .await?;
    Ok(())
}

/// Write `subscription` over its row if the row is still current and at
/// the same version. Returns the number of rows changed.
async fn update_row<'e, E>(executor: E, subscription: &Subscription) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(&format!(
        r#"
        UPDATE subscriptions SET
            tier = $2,
            status = $3,
            billing_cycle = $4,
            current_period_end = $5,
            ended_at = $6,
            quantity = $7,
            amount_pence = $8,
            currency = $9,
            auto_renew = $10,
            updated_at = $11,
            version = version + 1
        WHERE id = $1 AND version = $12 AND status NOT IN {}
        "#,
        CLOSED_STATUSES
    ))
    .bind(subscription.id.as_uuid())
    .bind(subscription.tier.as_str())
    .bind(subscription.status.as_str())
    .bind(subscription.billing_cycle.as_str())
    .bind(subscription.current_period_end.as_datetime())
    .bind(subscription.ended_at.map(|t| *t.as_datetime()))
    .bind(subscription.quantity.map(i64::from))
    .bind(subscription.amount_pence)
    .bind(&subscription.currency)
    .bind(subscription.auto_renew)
    .bind(subscription.updated_at.as_datetime())
    .bind(subscription.version as i32)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Explain why a conditional update matched no row.
async fn missed_write<'e, E>(executor: E, subscription: &Subscription) -> DomainError
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let stored: Result<Option<(String, i32)>, sqlx::Error> =
        sqlx::query_as("SELECT status, version FROM subscriptions WHERE id = $1")
            .bind(subscription.id.as_uuid())
            .fetch_optional(executor)
            .await;

    match stored {
        Ok(None) => not_found(&subscription.id),
        Ok(Some((status, version))) => {
            stale_write(subscription, status.parse().ok(), version)
        }
        Err(e) => DomainError::database(format!("Failed to read subscription: {}", e)),
    }
}

fn stale_write(
    subscription: &Subscription,
    stored_status: Option<SubscriptionStatus>,
    stored_version: i32,
) -> DomainError {
    match stored_status {
        Some(status) if !status.is_current() => DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Subscription {} is already {}", subscription.id, status),
        )
        .with_detail("subscription_id", subscription.id.to_string()),
        _ => DomainError::new(
            ErrorCode::ConcurrencyConflict,
            format!(
                "Subscription {} changed since it was read (version {} is now {})",
                subscription.id, subscription.version, stored_version
            ),
        ),
    }
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
    .with_detail("subscription_id", id.to_string())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to find subscription: {}", e))
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_active_by_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE owner_id = $1 AND status NOT IN {}",
            SELECT_COLUMNS, CLOSED_STATUSES
        ))
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        insert(&self.pool, subscription)
            .await
            .map_err(|e| db_error("save", &subscription.owner_id, e))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let affected = update_row(&self.pool, subscription)
            .await
            .map_err(|e| db_error("update", &subscription.owner_id, e))?;

        if affected == 0 {
            return Err(missed_write(&self.pool, subscription).await);
        }
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

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::database(format!("Failed to begin transaction: {}", e))
        })?;

        let affected = update_row(&mut *tx, closed)
            .await
            .map_err(|e| db_error("close", &closed.owner_id, e))?;
        if affected == 0 {
            return Err(missed_write(&mut *tx, closed).await);
        }

        insert(&mut *tx, opened)
            .await
            .map_err(|e| db_error("open", &opened.owner_id, e))?;

        tx.commit().await.map_err(|e| {
            DomainError::database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    async fn list(&self, options: &ListOptions) -> Result<SubscriptionPage, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM subscriptions");
        push_filters(&mut count, options);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to count subscriptions: {}", e)))?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filters(&mut select, options);
        select.push(order_clause(options));
        if let Some(limit) = options.limit {
            select.push(" LIMIT ").push_bind(i64::from(limit));
        }
        let offset = options.offset.unwrap_or(0);
        select.push(" OFFSET ").push_bind(i64::from(offset));

        let rows: Vec<SubscriptionRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to list subscriptions: {}", e)))?;

        let items = rows
            .into_iter()
            .map(Subscription::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = u64::try_from(total).unwrap_or(0);
        let has_more = u64::from(offset) + (items.len() as u64) < total;

        Ok(SubscriptionPage {
            items,
            total,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            owner_id: "school-1".to_string(),
            tier: "la_tier2".to_string(),
            status: "past_due".to_string(),
            billing_cycle: "termly".to_string(),
            started_at: now,
            current_period_end: now,
            ended_at: None,
            quantity: Some(40),
            amount_pence: Some(250_000),
            currency: "GBP".to_string(),
            auto_renew: true,
            created_at: now,
            updated_at: now,
            version: 3,
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let sub = Subscription::try_from(row()).unwrap();
        assert_eq!(sub.tier, Tier::LaTier2);
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.billing_cycle, BillingCycle::Termly);
        assert_eq!(sub.quantity, Some(40));
        assert_eq!(sub.version, 3);
    }

    #[test]
    fn negative_version_in_row_is_database_error() {
        let mut bad = row();
        bad.version = -1;
        assert_eq!(
            Subscription::try_from(bad).unwrap_err().code,
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn missed_write_on_closed_row_is_invalid_transition() {
        let sub = Subscription::try_from(row()).unwrap();
        let err = stale_write(&sub, Some(SubscriptionStatus::Cancelled), 4);
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn missed_write_on_open_row_is_concurrency_conflict() {
        let sub = Subscription::try_from(row()).unwrap();
        let err = stale_write(&sub, Some(SubscriptionStatus::Active), 4);
        assert_eq!(err.code, ErrorCode::ConcurrencyConflict);
        assert!(err.message.contains("version 3 is now 4"));
    }

    #[test]
    fn unknown_tier_in_row_is_database_error() {
        let mut bad = row();
        bad.tier = "gold".to_string();
        let err = Subscription::try_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn negative_quantity_in_row_is_database_error() {
        let mut bad = row();
        bad.quantity = Some(-3);
        assert!(Subscription::try_from(bad).is_err());
    }

    #[test]
    fn order_clause_follows_options() {
        let options = ListOptions::default();
        assert_eq!(order_clause(&options), " ORDER BY created_at DESC, id DESC");
        let options = options.sorted_by(SortField::StartedAt, SortDirection::Ascending);
        assert_eq!(order_clause(&options), " ORDER BY started_at ASC, id ASC");
    }

    #[test]
    fn filters_render_bound_parameters() {
        let options = ListOptions::default()
            .for_owner(OwnerId::new("school-1").unwrap())
            .with_tier(Tier::SchoolSmall)
            .current_only();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM subscriptions");
        push_filters(&mut builder, &options);
        let sql = builder.sql();
        assert!(sql.contains("owner_id = $1"));
        assert!(sql.contains("tier = $2"));
        assert!(sql.contains("NOT IN ('cancelled', 'trial_expired')"));
    }
}
