//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, money helpers and error types
//! that form the vocabulary of the commerce domain.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{
    BuyerId, GatewayCode, GatewaySettingId, OrderId, ProductId, SubscriptionId, TenantId,
    TransactionId,
};
pub use money::{prorate, Currency};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
