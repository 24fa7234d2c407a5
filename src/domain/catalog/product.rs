//! Product value types as seen by checkout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Currency, ProductId, TenantId, Timestamp, ValidationError};

/// Length of one billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Number of calendar months in one period.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Yearly => 12,
        }
    }

    /// End of a period that starts at `start`.
    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        start.add_months(self.months())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(ValidationError::invalid_format(
                "billing_cycle",
                format!("unknown cycle '{}'", other),
            )),
        }
    }
}

/// Recurring price list of a subscription-capable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTerms {
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    /// Free days before the first charge; 0 disables the trial.
    pub trial_days: u32,
}

/// A purchasable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub currency: Currency,
    /// One-time price.
    pub price_cents: i64,
    pub active: bool,
    pub recurring: Option<RecurringTerms>,
}

impl Product {
    /// True when the product can back a subscription.
    pub fn is_subscription(&self) -> bool {
        self.recurring.is_some()
    }

    /// Price of one period for the given cycle, if the product recurs.
    pub fn recurring_price(&self, cycle: BillingCycle) -> Option<i64> {
        self.recurring.as_ref().map(|terms| match cycle {
            BillingCycle::Monthly => terms.monthly_price_cents,
            BillingCycle::Yearly => terms.yearly_price_cents,
        })
    }

    pub fn trial_days(&self) -> u32 {
        self.recurring.as_ref().map_or(0, |terms| terms.trial_days)
    }
}
