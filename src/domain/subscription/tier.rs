//! Subscription tier identifiers.
//!
//! The variant set is closed; ranks, limits and feature rows live in the
//! tier catalogue, not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription plan level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Time-limited evaluation.
    Trial,
    /// Sales demonstration account.
    Demo,
    /// Grandfathered plan from the previous pricing scheme.
    Legacy,
    SchoolSmall,
    SchoolLarge,
    /// Multi-academy trust, up to 5 schools.
    MatSmall,
    MatMedium,
    MatLarge,
    /// Local authority tier 1.
    LaTier1,
    LaTier2,
    LaTier3,
    ResearchIndividual,
    ResearchInstitutional,
    ResearchPartnership,
}

/// Customer segment a tier is sold to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Evaluation,
    School,
    MultiAcademyTrust,
    LocalAuthority,
    Research,
}

impl Tier {
    /// Every tier, in declaration order.
    pub const ALL: [Tier; 14] = [
        Tier::Trial,
        Tier::Demo,
        Tier::Legacy,
        Tier::SchoolSmall,
        Tier::SchoolLarge,
        Tier::MatSmall,
        Tier::MatMedium,
        Tier::MatLarge,
        Tier::LaTier1,
        Tier::LaTier2,
        Tier::LaTier3,
        Tier::ResearchIndividual,
        Tier::ResearchInstitutional,
        Tier::ResearchPartnership,
    ];

    /// Wire identifier (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Trial => "trial",
            Tier::Demo => "demo",
            Tier::Legacy => "legacy",
            Tier::SchoolSmall => "school_small",
            Tier::SchoolLarge => "school_large",
            Tier::MatSmall => "mat_small",
            Tier::MatMedium => "mat_medium",
            Tier::MatLarge => "mat_large",
            Tier::LaTier1 => "la_tier1",
            Tier::LaTier2 => "la_tier2",
            Tier::LaTier3 => "la_tier3",
            Tier::ResearchIndividual => "research_individual",
            Tier::ResearchInstitutional => "research_institutional",
            Tier::ResearchPartnership => "research_partnership",
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            Tier::Trial | Tier::Demo | Tier::Legacy => Audience::Evaluation,
            Tier::SchoolSmall | Tier::SchoolLarge => Audience::School,
            Tier::MatSmall | Tier::MatMedium | Tier::MatLarge => Audience::MultiAcademyTrust,
            Tier::LaTier1 | Tier::LaTier2 | Tier::LaTier3 => Audience::LocalAuthority,
            Tier::ResearchIndividual | Tier::ResearchInstitutional | Tier::ResearchPartnership => {
                Audience::Research
            }
        }
    }

    /// Returns true for tiers that are never billed.
    pub fn is_complimentary(&self) -> bool {
        matches!(self, Tier::Trial | Tier::Demo)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .iter()
            .copied()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("tier", format!("unknown tier '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_serde_for_every_tier() {
        for tier in Tier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
        }
    }

    #[test]
    fn parses_every_wire_identifier() {
        for tier in Tier::ALL {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
    }

    #[test]
    fn local_authority_tiers_use_compact_names() {
        assert_eq!(serde_json::to_string(&Tier::LaTier2).unwrap(), "\"la_tier2\"");
        let tier: Tier = serde_json::from_str("\"la_tier3\"").unwrap();
        assert_eq!(tier, Tier::LaTier3);
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert!("platinum".parse::<Tier>().is_err());
        assert!(serde_json::from_str::<Tier>("\"platinum\"").is_err());
    }

    #[test]
    fn audiences_group_tiers() {
        assert_eq!(Tier::SchoolSmall.audience(), Audience::School);
        assert_eq!(Tier::MatMedium.audience(), Audience::MultiAcademyTrust);
        assert_eq!(Tier::LaTier1.audience(), Audience::LocalAuthority);
        assert_eq!(Tier::ResearchPartnership.audience(), Audience::Research);
        assert_eq!(Tier::Legacy.audience(), Audience::Evaluation);
    }

    #[test]
    fn only_trial_and_demo_are_complimentary() {
        let free: Vec<Tier> = Tier::ALL
            .iter()
            .copied()
            .filter(Tier::is_complimentary)
            .collect();
        assert_eq!(free, vec![Tier::Trial, Tier::Demo]);
    }
}
