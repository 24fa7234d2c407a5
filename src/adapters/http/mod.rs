//! HTTP adapters - REST API implementations.

pub mod commerce;

pub use commerce::{commerce_app, CommerceAppState};
