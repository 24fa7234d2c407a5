//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod gateway;
pub(crate) mod notify;
pub mod order;
pub mod payment;
pub mod subscription;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use gateway::{
    ConfigureGatewayCommand, ConfigureGatewayHandler, ListGatewaysHandler,
    SetDefaultGatewayCommand, SetDefaultGatewayHandler,
};
pub use order::{
    CreateOrderCommand, CreateOrderHandler, GetOrderHandler, GetOrderQuery, OrderView,
    TransitionOrderCommand, TransitionOrderHandler,
};
pub use payment::{
    AttemptKind, CheckoutCommand, CheckoutHandler, CreatePaymentCommand, CreatePaymentHandler,
    PaymentAttemptResult, PaymentAttempts, PaymentError, PaymentSettings, RetryPaymentCommand,
    RetryPaymentHandler,
};
pub use subscription::{
    CalculateProrationHandler, CalculateProrationQuery, ChangePlanCommand, ChangePlanHandler,
    ChangePlanResult, ManageSubscriptionCommand, ManageSubscriptionHandler, StartTrialCommand,
    StartTrialHandler, SubscriptionAction, SubscriptionActor, SweepReport, SweepSubscriptionsHandler,
};
pub use webhook::{HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, WebhookResult};
