//! In-memory event bus.
//!
//! Records every published envelope and logs it. Used by tests for
//! assertions and by the binary as the default notification sink.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// In-process event bus that keeps published events for inspection.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
/// assert!(bus.has_event("order.completed.v1"));
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    capacity: Option<usize>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            capacity: None,
        }
    }

    /// Keeps only the most recent `capacity` envelopes.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            tenant_id = event.metadata.tenant_id.as_deref().unwrap_or("-"),
            "domain event published"
        );
        let mut published = self
            .published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(capacity) = self.capacity {
            if published.len() >= capacity {
                let excess = published.len() + 1 - capacity;
                published.drain(..excess);
            }
        }
        published.push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, "ord-1", "Order", json!({"total": 5500}))
    }

    #[tokio::test]
    async fn records_published_events_in_order() {
        let bus = InMemoryEventBus::new();
        bus.publish_all(vec![envelope("order.completed.v1"), envelope("subscription.activated.v1")])
            .await
            .unwrap();

        let events = bus.published_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "order.completed.v1");
        assert!(bus.has_event("subscription.activated.v1"));
        assert_eq!(bus.events_of_type("order.completed.v1").len(), 1);
    }

    #[tokio::test]
    async fn bounded_bus_drops_oldest() {
        let bus = InMemoryEventBus::bounded(2);
        for event_type in ["a.v1", "b.v1", "c.v1"] {
            bus.publish(envelope(event_type)).await.unwrap();
        }

        let types: Vec<_> = bus.published_events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec!["b.v1", "c.v1"]);
    }
}
