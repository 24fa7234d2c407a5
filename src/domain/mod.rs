//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, money, errors, events)
//! - `catalog` - Products and their recurring terms
//! - `order` - Orders, line items, and payment attempts
//! - `gateway` - Per-tenant gateway settings and the canonical charge result
//! - `subscription` - Recurring billing lifecycle and proration
//! - `reconciliation` - Webhook verification and state reconciliation

pub mod catalog;
pub mod foundation;
pub mod gateway;
pub mod order;
pub mod reconciliation;
pub mod subscription;
