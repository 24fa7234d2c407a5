//! Commission and tax strategies.

mod rate_calculator;

pub use rate_calculator::RateCommissionCalculator;
