//! Tier catalogue: ranks, capacity limits and the tier × feature table.
//!
//! The catalogue is static configuration. It is loaded once at startup,
//! validated, and then shared read-only. A catalogue that fails validation
//! is fatal: the service must not start with a partial table.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::subscription::{CapacityLimits, Feature, Tier};

/// Built-in catalogue compiled into the binary.
pub const DEFAULT_CATALOGUE_YAML: &str = include_str!("../../../catalogue/default.yaml");

/// Errors raised while loading or validating a catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Failed to read catalogue {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML, or an unknown tier or feature identifier.
    #[error("Failed to parse catalogue: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Tier '{0}' is missing from the catalogue")]
    MissingTier(Tier),

    #[error("Tier '{0}' appears more than once in the catalogue")]
    DuplicateTier(Tier),

    #[error("Tier '{tier}' has no entry for features: {missing:?}")]
    IncompleteFeatureRow { tier: Tier, missing: Vec<Feature> },

    #[error("Tier '{0}' has an empty display name")]
    EmptyDisplayName(Tier),
}

fn default_true() -> bool {
    true
}

/// One catalogue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierEntry {
    #[serde(rename = "id")]
    pub tier: Tier,

    pub display_name: String,

    /// Position in the upgrade order. Ties are allowed.
    pub rank: u32,

    /// False for tiers that are never offered as an upgrade target.
    #[serde(default = "default_true")]
    pub purchasable: bool,

    /// Upgrades to this tier go through the sales team.
    #[serde(default)]
    pub sales_led: bool,

    pub limits: CapacityLimits,

    pub features: BTreeMap<Feature, bool>,
}

impl TierEntry {
    pub fn includes(&self, feature: Feature) -> bool {
        self.features.get(&feature).copied().unwrap_or(false)
    }

    /// Features switched on for this tier, in declaration order.
    pub fn included_features(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|feature| self.includes(*feature))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogueFile {
    tiers: Vec<TierEntry>,
}

/// Validated, immutable tier catalogue.
///
/// The only constructors validate, so every [`Tier`] has exactly one entry
/// with a complete feature row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCatalogue {
    entries: BTreeMap<Tier, TierEntry>,
}

impl TierCatalogue {
    /// Loads the catalogue compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_yaml_str(DEFAULT_CATALOGUE_YAML)
    }

    /// Loads a catalogue from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parses and validates a YAML catalogue document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = serde_yaml::from_str(raw)?;
        Self::from_entries(file.tiers)
    }

    /// Builds a catalogue from rows, validating them first.
    pub fn from_entries(entries: Vec<TierEntry>) -> Result<Self, CatalogueError> {
        Self::validate(&entries)?;
        let entries = entries
            .into_iter()
            .map(|entry| (entry.tier, entry))
            .collect();
        Ok(Self { entries })
    }

    /// Checks that every tier appears exactly once with a complete
    /// feature row and a display name.
    pub fn validate(entries: &[TierEntry]) -> Result<(), CatalogueError> {
        let mut seen: BTreeSet<Tier> = BTreeSet::new();
        for entry in entries {
            if !seen.insert(entry.tier) {
                return Err(CatalogueError::DuplicateTier(entry.tier));
            }
            if entry.display_name.trim().is_empty() {
                return Err(CatalogueError::EmptyDisplayName(entry.tier));
            }
            let missing: Vec<Feature> = Feature::ALL
                .iter()
                .copied()
                .filter(|feature| !entry.features.contains_key(feature))
                .collect();
            if !missing.is_empty() {
                return Err(CatalogueError::IncompleteFeatureRow {
                    tier: entry.tier,
                    missing,
                });
            }
        }

        if let Some(tier) = Tier::ALL.iter().find(|tier| !seen.contains(*tier)) {
            return Err(CatalogueError::MissingTier(*tier));
        }

        Ok(())
    }

    pub fn entry(&self, tier: Tier) -> Option<&TierEntry> {
        self.entries.get(&tier)
    }

    /// Static inclusion lookup for (tier, feature).
    pub fn includes(&self, tier: Tier, feature: Feature) -> bool {
        self.entry(tier)
            .map(|entry| entry.includes(feature))
            .unwrap_or(false)
    }

    /// Capacity limits for a tier. A tier with no row gets zero capacity.
    pub fn limits(&self, tier: Tier) -> CapacityLimits {
        self.entry(tier)
            .map(|entry| entry.limits)
            .unwrap_or(CapacityLimits::NONE)
    }

    pub fn rank(&self, tier: Tier) -> u32 {
        self.entry(tier).map(|entry| entry.rank).unwrap_or(0)
    }

    pub fn display_name(&self, tier: Tier) -> &str {
        self.entry(tier)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or_else(|| tier.as_str())
    }

    /// All rows ordered by rank, ties in tier declaration order.
    pub fn tiers_by_rank(&self) -> Vec<&TierEntry> {
        let mut rows: Vec<&TierEntry> = self.entries.values().collect();
        rows.sort_by_key(|entry| (entry.rank, entry.tier));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::{CapacityLimit, ResourceKind};

    fn full_row(value: bool) -> BTreeMap<Feature, bool> {
        Feature::ALL.iter().map(|feature| (*feature, value)).collect()
    }

    fn entry(tier: Tier, rank: u32) -> TierEntry {
        TierEntry {
            tier,
            display_name: tier.as_str().to_string(),
            rank,
            purchasable: true,
            sales_led: false,
            limits: CapacityLimits::NONE,
            features: full_row(false),
        }
    }

    fn all_entries() -> Vec<TierEntry> {
        Tier::ALL
            .iter()
            .enumerate()
            .map(|(i, tier)| entry(*tier, i as u32))
            .collect()
    }

    #[test]
    fn builtin_catalogue_is_valid() {
        let catalogue = TierCatalogue::builtin().unwrap();
        for tier in Tier::ALL {
            assert!(catalogue.entry(tier).is_some(), "{} missing", tier);
        }
    }

    #[test]
    fn builtin_school_small_row() {
        let catalogue = TierCatalogue::builtin().unwrap();
        assert!(catalogue.includes(Tier::SchoolSmall, Feature::BattleRoyale));
        assert!(!catalogue.includes(Tier::SchoolSmall, Feature::SimsIntegration));
    }

    #[test]
    fn builtin_has_equal_ranks_across_audiences() {
        let catalogue = TierCatalogue::builtin().unwrap();
        assert_eq!(
            catalogue.rank(Tier::SchoolSmall),
            catalogue.rank(Tier::ResearchIndividual)
        );
    }

    #[test]
    fn builtin_top_tier_is_unlimited() {
        let catalogue = TierCatalogue::builtin().unwrap();
        let limits = catalogue.limits(Tier::LaTier3);
        for resource in ResourceKind::ALL {
            assert_eq!(limits.limit_for(resource), CapacityLimit::Unlimited);
        }
    }

    #[test]
    fn missing_tier_is_rejected() {
        let mut entries = all_entries();
        entries.retain(|e| e.tier != Tier::MatMedium);
        let err = TierCatalogue::from_entries(entries).unwrap_err();
        assert!(matches!(err, CatalogueError::MissingTier(Tier::MatMedium)));
    }

    #[test]
    fn duplicate_tier_is_rejected() {
        let mut entries = all_entries();
        entries.push(entry(Tier::Demo, 3));
        let err = TierCatalogue::from_entries(entries).unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateTier(Tier::Demo)));
    }

    #[test]
    fn incomplete_feature_row_is_rejected() {
        let mut entries = all_entries();
        entries[4].features.remove(&Feature::Sso);
        let err = TierCatalogue::from_entries(entries).unwrap_err();
        match err {
            CatalogueError::IncompleteFeatureRow { tier, missing } => {
                assert_eq!(tier, Tier::SchoolLarge);
                assert_eq!(missing, vec![Feature::Sso]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_display_name_is_rejected() {
        let mut entries = all_entries();
        entries[0].display_name = "  ".to_string();
        assert!(matches!(
            TierCatalogue::from_entries(entries),
            Err(CatalogueError::EmptyDisplayName(Tier::Trial))
        ));
    }

    #[test]
    fn unknown_feature_identifier_fails_to_parse() {
        let yaml = DEFAULT_CATALOGUE_YAML.replacen("priority_support", "teleportation", 1);
        let err = TierCatalogue::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, CatalogueError::Parse(_)));
    }

    #[test]
    fn unknown_tier_identifier_fails_to_parse() {
        let yaml = DEFAULT_CATALOGUE_YAML.replacen("id: legacy", "id: platinum", 1);
        let err = TierCatalogue::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, CatalogueError::Parse(_)));
    }

    #[test]
    fn invalid_limit_keyword_fails_to_parse() {
        let yaml = DEFAULT_CATALOGUE_YAML.replacen("max_users: unlimited", "max_users: lots", 1);
        assert!(TierCatalogue::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TierCatalogue::from_path("/nonexistent/catalogue.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalogue.yaml"));
    }

    #[test]
    fn tiers_by_rank_breaks_ties_by_declaration() {
        let catalogue = TierCatalogue::builtin().unwrap();
        let order: Vec<Tier> = catalogue.tiers_by_rank().iter().map(|e| e.tier).collect();
        assert_eq!(order[0], Tier::Trial);
        assert_eq!(order[1], Tier::Demo);
        let small = order.iter().position(|t| *t == Tier::SchoolSmall).unwrap();
        let research = order
            .iter()
            .position(|t| *t == Tier::ResearchIndividual)
            .unwrap();
        assert!(small < research);
        assert_eq!(order.last(), Some(&Tier::LaTier3));
    }

    #[test]
    fn included_features_lists_enabled_only() {
        let catalogue = TierCatalogue::builtin().unwrap();
        let legacy = catalogue.entry(Tier::Legacy).unwrap().included_features();
        assert_eq!(legacy, vec![Feature::Certificates, Feature::DataExport]);
    }
}
