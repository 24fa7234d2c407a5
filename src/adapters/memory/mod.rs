//! In-memory persistence adapters.

mod store;

pub use store::InMemoryCommerceStore;
