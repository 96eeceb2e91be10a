//! Tier catalogue source configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::entitlement::{CatalogueError, TierCatalogue};

use super::error::ValidationError;

/// Where the tier catalogue is read from.
///
/// With no path the catalogue compiled into the binary is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogueConfig {
    /// YAML file replacing the built-in catalogue
    pub path: Option<PathBuf>,
}

impl CatalogueConfig {
    /// Loads and validates the configured catalogue.
    pub fn load(&self) -> Result<TierCatalogue, CatalogueError> {
        match &self.path {
            Some(path) => TierCatalogue::from_path(path),
            None => TierCatalogue::builtin(),
        }
    }

    /// Human-readable origin, for the startup log line.
    pub fn source(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "builtin".to_string())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.path, Some(p) if p.as_os_str().is_empty()) {
            return Err(ValidationError::EmptyCataloguePath);
        }
        Ok(())
    }
}
