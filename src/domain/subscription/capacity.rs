//! Capacity limits and usage counters.
//!
//! Limits are inclusive caps: an owner with `current == max` is still within
//! its limit. `Unlimited` is an explicit variant rather than a large number.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{OwnerId, ValidationError};

/// Countable resource governed by a tier limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Staff accounts.
    Users,
    Students,
    Schools,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Users,
        ResourceKind::Students,
        ResourceKind::Schools,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Users => "users",
            ResourceKind::Students => "students",
            ResourceKind::Schools => "schools",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("resource", format!("unknown resource '{}'", s))
            })
    }
}

/// Ceiling for one resource.
///
/// Serialized as a plain number or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum CapacityLimit {
    Limited(u32),
    Unlimited,
}

impl CapacityLimit {
    /// Returns true if `current` is within the cap (inclusive).
    pub fn allows(&self, current: u32) -> bool {
        match self {
            CapacityLimit::Limited(max) => current <= *max,
            CapacityLimit::Unlimited => true,
        }
    }

    /// Returns true if one more unit can be added without exceeding the cap.
    pub fn has_room_for_one_more(&self, current: u32) -> bool {
        match self {
            CapacityLimit::Limited(max) => current < *max,
            CapacityLimit::Unlimited => true,
        }
    }

    /// The numeric cap, or `None` when unlimited.
    pub fn max(&self) -> Option<u32> {
        match self {
            CapacityLimit::Limited(max) => Some(*max),
            CapacityLimit::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, CapacityLimit::Unlimited)
    }
}

impl fmt::Display for CapacityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityLimit::Limited(max) => write!(f, "{}", max),
            CapacityLimit::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<LimitRepr> for CapacityLimit {
    type Error = String;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Count(max) => Ok(CapacityLimit::Limited(max)),
            LimitRepr::Keyword(word) if word == "unlimited" => Ok(CapacityLimit::Unlimited),
            LimitRepr::Keyword(word) => Err(format!(
                "invalid capacity limit '{}': expected a number or \"unlimited\"",
                word
            )),
        }
    }
}

impl From<CapacityLimit> for LimitRepr {
    fn from(limit: CapacityLimit) -> Self {
        match limit {
            CapacityLimit::Limited(max) => LimitRepr::Count(max),
            CapacityLimit::Unlimited => LimitRepr::Keyword("unlimited".to_string()),
        }
    }
}

/// Per-tier capacity ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimits {
    pub max_users: CapacityLimit,
    pub max_students: CapacityLimit,
    pub max_schools: CapacityLimit,
}

impl CapacityLimits {
    /// All three resources capped at zero.
    pub const NONE: CapacityLimits = CapacityLimits {
        max_users: CapacityLimit::Limited(0),
        max_students: CapacityLimit::Limited(0),
        max_schools: CapacityLimit::Limited(0),
    };

    pub fn limit_for(&self, resource: ResourceKind) -> CapacityLimit {
        match resource {
            ResourceKind::Users => self.max_users,
            ResourceKind::Students => self.max_students,
            ResourceKind::Schools => self.max_schools,
        }
    }
}

/// Current consumption counters for one owner.
///
/// Written by the provisioning and enrollment services, read by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUsage {
    pub owner_id: OwnerId,
    pub current_users: u32,
    pub current_students: u32,
    pub current_schools: u32,
}

impl CapacityUsage {
    /// Zero usage for an owner with nothing provisioned yet.
    pub fn empty(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            current_users: 0,
            current_students: 0,
            current_schools: 0,
        }
    }

    pub fn current(&self, resource: ResourceKind) -> u32 {
        match resource {
            ResourceKind::Users => self.current_users,
            ResourceKind::Students => self.current_students,
            ResourceKind::Schools => self.current_schools,
        }
    }

    pub fn with(mut self, resource: ResourceKind, value: u32) -> Self {
        *self.counter_mut(resource) = value;
        self
    }

    pub fn counter_mut(&mut self, resource: ResourceKind) -> &mut u32 {
        match resource {
            ResourceKind::Users => &mut self.current_users,
            ResourceKind::Students => &mut self.current_students,
            ResourceKind::Schools => &mut self.current_schools,
        }
    }
}
