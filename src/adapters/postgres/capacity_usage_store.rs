//! PostgreSQL implementation of CapacityUsageStore.
//!
//! `try_increment` is a single conditional `UPDATE ... RETURNING`, so
//! concurrent callers are serialized by the row lock and can never push a
//! counter past its cap.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, OwnerId};
use crate::domain::subscription::{CapacityLimit, CapacityUsage, ResourceKind};
use crate::ports::{CapacityUsageStore, Reservation};

#[derive(Debug, Clone)]
pub struct PostgresCapacityUsageStore {
    pool: PgPool,
}

impl PostgresCapacityUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_row(&self, owner_id: &OwnerId) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO capacity_usage (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to create usage row: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    current_users: i64,
    current_students: i64,
    current_schools: i64,
}

fn column(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::Users => "current_users",
        ResourceKind::Students => "current_students",
        ResourceKind::Schools => "current_schools",
    }
}

/// Largest value a counter may reach, whatever the plan allows.
const COUNTER_CEILING: i64 = u32::MAX as i64;

fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[async_trait]
impl CapacityUsageStore for PostgresCapacityUsageStore {
    async fn get_usage(&self, owner_id: &OwnerId) -> Result<CapacityUsage, DomainError> {
        let row: Option<UsageRow> = sqlx::query_as(
            r#"
            SELECT current_users, current_students, current_schools
            FROM capacity_usage
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to read capacity usage: {}", e)))?;

        Ok(match row {
            Some(row) => CapacityUsage {
                owner_id: owner_id.clone(),
                current_users: to_count(row.current_users),
                current_students: to_count(row.current_students),
                current_schools: to_count(row.current_schools),
            },
            None => CapacityUsage::empty(owner_id.clone()),
        })
    }

    async fn try_increment(
        &self,
        owner_id: &OwnerId,
        resource: ResourceKind,
        limit: CapacityLimit,
    ) -> Result<Reservation, DomainError> {
        self.ensure_row(owner_id).await?;

        let col = column(resource);
        let sql = format!(
            "UPDATE capacity_usage SET {col} = {col} + 1, updated_at = NOW() \
             WHERE owner_id = $1 AND {col} < COALESCE($2::BIGINT, $3) \
             RETURNING {col}"
        );
        let taken: Option<i64> = sqlx::query_scalar(&sql)
            .bind(owner_id.as_str())
            .bind(limit.max().map(i64::from))
            .bind(COUNTER_CEILING)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to increment capacity usage: {}", e))
            })?;

        if let Some(current) = taken {
            return Ok(Reservation::Reserved {
                current: to_count(current),
            });
        }

        let sql = format!("SELECT {col} FROM capacity_usage WHERE owner_id = $1");
        let current: i64 = sqlx::query_scalar(&sql)
            .bind(owner_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to read capacity usage: {}", e)))?;
        Ok(Reservation::Refused {
            current: to_count(current),
        })
    }

    async fn decrement(&self, owner_id: &OwnerId, resource: ResourceKind) -> Result<(), DomainError> {
        let col = column(resource);
        let sql = format!(
            "UPDATE capacity_usage SET {col} = GREATEST({col} - 1, 0), updated_at = NOW() \
             WHERE owner_id = $1"
        );
        sqlx::query(&sql)
            .bind(owner_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to decrement capacity usage: {}", e))
            })?;
        Ok(())
    }
}
