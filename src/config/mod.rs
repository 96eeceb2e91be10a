//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENTITLEMENTS` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use entitlements::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod catalogue;
mod database;
mod error;
mod server;

pub use catalogue::CatalogueConfig;
pub use database::{DatabaseConfig, MigrationMode};
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL storage; in-memory adapters are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Tier catalogue source
    #[serde(default)]
    pub catalogue: CatalogueConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ENTITLEMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENTS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENTITLEMENTS__DATABASE__URL=...` -> `database.url = ...`
    /// - `ENTITLEMENTS__CATALOGUE__PATH=...` -> `catalogue.path = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ENTITLEMENTS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.catalogue.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ENTITLEMENTS__DATABASE__URL",
        "ENTITLEMENTS__DATABASE__MAX_CONNECTIONS",
        "ENTITLEMENTS__DATABASE__MIGRATIONS",
        "ENTITLEMENTS__SERVER__PORT",
        "ENTITLEMENTS__SERVER__ENVIRONMENT",
        "ENTITLEMENTS__SERVER__LOG_FORMAT",
        "ENTITLEMENTS__CATALOGUE__PATH",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_no_variables_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.database.is_none());
        assert!(config.catalogue.path.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_database_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENTS__DATABASE__URL", "postgres://localhost/entitlements");
        env::set_var("ENTITLEMENTS__DATABASE__MAX_CONNECTIONS", "4");
        env::set_var("ENTITLEMENTS__DATABASE__MIGRATIONS", "verify");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        let database = config.database.expect("database section");
        assert_eq!(database.url, "postgres://localhost/entitlements");
        assert_eq!(database.max_connections, 4);
        assert_eq!(database.migrations, MigrationMode::Verify);
        assert_eq!(database.application_name, "entitlements");
    }

    #[test]
    fn test_invalid_database_url_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENTS__DATABASE__URL", "mysql://localhost/entitlements");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn test_server_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENTS__SERVER__PORT", "3000");
        env::set_var("ENTITLEMENTS__SERVER__ENVIRONMENT", "production");
        env::set_var("ENTITLEMENTS__SERVER__LOG_FORMAT", "json");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert!(config.is_production());
    }

    #[test]
    fn test_catalogue_path_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ENTITLEMENTS__CATALOGUE__PATH", "/etc/entitlements/catalogue.yaml");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.catalogue.source(),
            "/etc/entitlements/catalogue.yaml"
        );
    }
}
