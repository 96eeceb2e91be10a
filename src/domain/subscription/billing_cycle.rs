//! Billing cycle of a subscription.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, ValidationError};

/// How often the subscription is invoiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    /// One school term (three per academic year).
    Termly,
    Annually,
}

impl BillingCycle {
    /// Length of one billing period in calendar months.
    pub fn period_months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Termly => 4,
            BillingCycle::Annually => 12,
        }
    }

    /// End of the billing period that starts at `start`.
    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        start.add_months(self.period_months())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Termly => "termly",
            BillingCycle::Annually => "annually",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "termly" => Ok(BillingCycle::Termly),
            "annually" => Ok(BillingCycle::Annually),
            other => Err(ValidationError::invalid_format(
                "billing_cycle",
                format!("unknown billing cycle '{}'", other),
            )),
        }
    }
}
