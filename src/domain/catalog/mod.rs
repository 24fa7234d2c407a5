//! Catalog read model consumed by the ledger.
//!
//! Products are owned by the catalog service; this crate only reads
//! current prices and capabilities when pricing an order.

mod product;

pub use product::{BillingCycle, Product, RecurringTerms};
