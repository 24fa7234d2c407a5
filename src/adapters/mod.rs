//! Adapters - Implementations of port interfaces.
//!
//! - `gateways` - processor adapters and the tenant gateway registry
//! - `postgres` / `memory` - persistence
//! - `http` - axum routes
//! - `crypto` - at-rest credential encryption
//! - `commission` - fee and tax calculation
//! - `events` - event publishing

pub mod commission;
pub mod crypto;
pub mod events;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod postgres;

pub use commission::RateCommissionCalculator;
pub use crypto::AesGcmCipher;
pub use events::InMemoryEventBus;
pub use gateways::{GatewayRegistry, MockGatewayAdapter, MockGatewayResolver};
pub use memory::InMemoryCommerceStore;
