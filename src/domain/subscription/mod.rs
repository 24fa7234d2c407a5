//! Subscription module - recurring billing state, renewal, and proration.

mod aggregate;
mod errors;
mod events;
mod proration;
mod status;

pub use aggregate::{NewSubscription, ProductSubscription};
pub use errors::SubscriptionError;
pub use events::{
    SubscriptionActivated, SubscriptionPastDue, SubscriptionRenewed, SubscriptionStatusChanged,
};
pub use proration::{calculate_proration, Proration};
pub use status::SubscriptionStatus;

#[cfg(test)]
pub(crate) use aggregate::test_support;
