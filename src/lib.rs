//! Certify Commerce - multi-tenant payments, orders, and subscriptions.
//!
//! Tenants configure their own payment gateways; buyers check out against
//! them, and signed gateway webhooks settle orders and drive subscription
//! lifecycles.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
