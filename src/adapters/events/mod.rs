//! Event bus adapters.
//!
//! - `InMemoryEventBus` - in-process bus that records every envelope; used by
//!   tests and by single-node deployments that only need the log line

mod in_memory;

pub use in_memory::InMemoryEventBus;
