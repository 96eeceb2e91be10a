//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid listen address '{0}'")]
    InvalidListenAddress(String),

    #[error("Timeouts must be greater than zero")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool needs at least one connection and min_connections <= max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (50)")]
    PoolSizeTooLarge,

    #[error("Catalogue path is set but empty")]
    EmptyCataloguePath,
}
