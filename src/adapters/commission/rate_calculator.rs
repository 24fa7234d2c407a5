//! Flat basis-point commission and tax strategy.

use crate::domain::foundation::{prorate, DomainError};
use crate::domain::order::{CommissionSplit, Order};
use crate::ports::CommissionCalculator;

const BASIS_POINTS: i64 = 10_000;

/// Platform fee and tax as fixed basis points of the order total.
#[derive(Debug, Clone, Copy)]
pub struct RateCommissionCalculator {
    fee_bps: u32,
    tax_bps: u32,
}

impl RateCommissionCalculator {
    pub fn new(fee_bps: u32, tax_bps: u32) -> Self {
        Self { fee_bps, tax_bps }
    }
}

impl CommissionCalculator for RateCommissionCalculator {
    fn compute_split(&self, order: &Order) -> Result<CommissionSplit, DomainError> {
        let total = order.total_amount_cents;
        let fees_cents = prorate(total, self.fee_bps as i64, BASIS_POINTS);
        let taxes_cents = prorate(total, self.tax_bps as i64, BASIS_POINTS);
        let net_to_merchant_cents = total
            .checked_sub(fees_cents)
            .and_then(|rest| rest.checked_sub(taxes_cents))
            .filter(|net| *net >= 0)
            .ok_or_else(|| {
                DomainError::validation("commission", "fees and taxes exceed the order total")
            })?;

        Ok(CommissionSplit {
            fees_cents,
            taxes_cents,
            net_to_merchant_cents,
        })
    }
}
