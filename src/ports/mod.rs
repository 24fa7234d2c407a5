//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Ports
//!
//! - `GatewayAdapter` - One processor family behind the canonical contract
//! - `GatewayResolver` - Tenant gateway code to adapter
//! - `GatewaySettingRepository` - Tenant gateway configuration
//! - `CredentialCipher` - Encryption of stored gateway secrets
//!
//! ## Ledger Ports
//!
//! - `OrderRepository` - Orders and their status edges
//! - `PaymentLedger` - Transaction attempts and webhook reconciliation
//! - `SubscriptionRepository` - Locked subscription mutation
//! - `ProductCatalog` - Current product prices
//!
//! ## Collaborator Ports
//!
//! - `CommissionCalculator` - Fee and tax split
//! - `EventPublisher` - Post-commit domain events

mod commission_calculator;
mod credential_cipher;
mod event_publisher;
mod gateway_adapter;
mod gateway_setting_repository;
mod order_repository;
mod payment_ledger;
mod product_catalog;
mod subscription_repository;

pub use commission_calculator::CommissionCalculator;
pub use credential_cipher::CredentialCipher;
pub use event_publisher::EventPublisher;
pub use gateway_adapter::{ChargeContext, GatewayAdapter, GatewayResolver, ResolvedGateway};
pub use gateway_setting_repository::GatewaySettingRepository;
pub use order_repository::OrderRepository;
pub use payment_ledger::{PaymentLedger, ReconcileFn};
pub use product_catalog::ProductCatalog;
pub use subscription_repository::{SubscriptionChange, SubscriptionMutation, SubscriptionRepository};
