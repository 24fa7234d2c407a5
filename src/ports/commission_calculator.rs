//! CommissionCalculator port - fee and tax breakdown strategy.

use crate::domain::foundation::DomainError;
use crate::domain::order::{CommissionSplit, Order};

/// Pure strategy consulted when a payment attempt starts.
///
/// The split is informational and never alters the order total.
pub trait CommissionCalculator: Send + Sync {
    fn compute_split(&self, order: &Order) -> Result<CommissionSplit, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn CommissionCalculator) {}
}
