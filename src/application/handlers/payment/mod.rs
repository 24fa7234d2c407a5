//! Payment coordination handlers.

mod attempt;
mod checkout;
mod create_payment;
mod errors;
mod retry_payment;

pub use attempt::{AttemptKind, PaymentAttemptResult, PaymentAttempts, PaymentSettings};
pub use checkout::{CheckoutCommand, CheckoutHandler};
pub use create_payment::{CreatePaymentCommand, CreatePaymentHandler};
pub use errors::PaymentError;
pub use retry_payment::{RetryPaymentCommand, RetryPaymentHandler};
