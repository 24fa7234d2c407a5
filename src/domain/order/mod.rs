//! Order module - purchase intents, their lines, and payment attempts.

mod aggregate;
mod errors;
mod events;
mod status;
mod transaction;

pub use aggregate::{
    BillingSnapshot, LineRequest, NewOrder, Order, OrderItem, OrderType, MAX_LINE_QUANTITY,
};
pub use errors::OrderError;
pub use events::{OrderCompleted, OrderFailed, OrderRefunded};
pub use status::{OrderStatus, TransactionStatus};
pub use transaction::{record_acceptance, CommissionSplit, Transaction};

#[cfg(test)]
pub(crate) use aggregate::test_support;
