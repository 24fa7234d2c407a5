//! Post-commit event publication.
//!
//! State is already committed when these run, so publication failures are
//! logged and never surface to the caller.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainEvent, EventEnvelope, TenantId};
use crate::ports::EventPublisher;

/// Wraps `event` in an envelope tagged with its tenant.
pub(crate) fn envelope<E>(event: &E, tenant_id: TenantId) -> Option<EventEnvelope>
where
    E: DomainEvent + Serialize,
{
    match EventEnvelope::from_event(event) {
        Ok(envelope) => Some(envelope.with_tenant_id(tenant_id.to_string())),
        Err(err) => {
            tracing::error!(
                event_type = event.event_type(),
                error = %err,
                "Failed to serialize domain event"
            );
            None
        }
    }
}

pub(crate) async fn publish(publisher: &dyn EventPublisher, events: Vec<EventEnvelope>) {
    if events.is_empty() {
        return;
    }
    if let Err(err) = publisher.publish_all(events).await {
        tracing::error!(error = %err, "Failed to publish domain events");
    }
}

/// Publishes on a detached task so the caller can answer immediately.
pub(crate) fn spawn_publish(publisher: Arc<dyn EventPublisher>, events: Vec<EventEnvelope>) {
    if events.is_empty() {
        return;
    }
    tokio::spawn(async move {
        publish(publisher.as_ref(), events).await;
    });
}
