//! PostgreSQL storage settings.
//!
//! Entitlement checks sit on the request path of every other service, so a
//! slow database should fail a check quickly rather than hold a connection.
//! The defaults reflect that: a short acquire timeout and a per-statement
//! timeout sent to the server.

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;

use super::error::ValidationError;

/// Largest pool this service will open against one database.
pub const MAX_POOL_SIZE: u32 = 50;

/// What to do with `migrations/` at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    /// Apply any pending migrations.
    #[default]
    Apply,
    /// Refuse to start unless every bundled migration is already applied.
    /// For deployments where schema changes are run separately.
    Verify,
    /// Do nothing.
    Skip,
}

/// Connection settings for the `subscriptions` and `capacity_usage` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a pooled connection
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Server-side `statement_timeout` for every connection
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,

    /// Reported in `pg_stat_activity`
    #[serde(default = "default_application_name")]
    pub application_name: String,

    #[serde(default)]
    pub migrations: MigrationMode,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Connection options with the application name and statement timeout
    /// applied on top of the URL.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ValidationError> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|_| ValidationError::InvalidDatabaseUrl)?;
        Ok(options
            .application_name(&self.application_name)
            .options([("statement_timeout", format!("{}ms", self.statement_timeout_ms))]))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("ENTITLEMENTS__DATABASE__URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        self.connect_options()?;

        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.acquire_timeout_ms == 0 || self.statement_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.application_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired(
                "ENTITLEMENTS__DATABASE__APPLICATION_NAME",
            ));
        }
        Ok(())
    }
}

fn default_min_connections() -> u32 {
    1
}

// Checks are single-row reads; a small pool keeps up.
fn default_max_connections() -> u32 {
    8
}

fn default_acquire_timeout_ms() -> u64 {
    2_000
}

fn default_statement_timeout_ms() -> u64 {
    3_000
}

fn default_application_name() -> String {
    "entitlements".to_string()
}
