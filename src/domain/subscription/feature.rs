//! Gated product capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Capability flag checked before a product area is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Battle Royale gamified quizzes.
    BattleRoyale,
    AdvancedAnalytics,
    ApiAccess,
    /// Single sign-on through the school's identity provider.
    Sso,
    /// MIS integration (SIMS and compatible systems).
    SimsIntegration,
    /// Course completion certificates.
    Certificates,
    CustomBranding,
    BulkEnrollment,
    DataExport,
    PrioritySupport,
}

impl Feature {
    /// Every feature, in declaration order.
    pub const ALL: [Feature; 10] = [
        Feature::BattleRoyale,
        Feature::AdvancedAnalytics,
        Feature::ApiAccess,
        Feature::Sso,
        Feature::SimsIntegration,
        Feature::Certificates,
        Feature::CustomBranding,
        Feature::BulkEnrollment,
        Feature::DataExport,
        Feature::PrioritySupport,
    ];

    /// Wire identifier (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::BattleRoyale => "battle_royale",
            Feature::AdvancedAnalytics => "advanced_analytics",
            Feature::ApiAccess => "api_access",
            Feature::Sso => "sso",
            Feature::SimsIntegration => "sims_integration",
            Feature::Certificates => "certificates",
            Feature::CustomBranding => "custom_branding",
            Feature::BulkEnrollment => "bulk_enrollment",
            Feature::DataExport => "data_export",
            Feature::PrioritySupport => "priority_support",
        }
    }

    /// Human-readable name used in upgrade prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::BattleRoyale => "Battle Royale",
            Feature::AdvancedAnalytics => "Advanced Analytics",
            Feature::ApiAccess => "API Access",
            Feature::Sso => "Single Sign-On",
            Feature::SimsIntegration => "MIS Integration",
            Feature::Certificates => "Certificates",
            Feature::CustomBranding => "Custom Branding",
            Feature::BulkEnrollment => "Bulk Enrollment",
            Feature::DataExport => "Data Export",
            Feature::PrioritySupport => "Priority Support",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("feature", format!("unknown feature '{}'", s))
            })
    }
}
