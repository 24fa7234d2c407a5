//! Order domain events, published after the owning unit of work commits.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, OrderId, TenantId, Timestamp, TransactionId};
use crate::domain_event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    pub total_amount_cents: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    OrderCompleted,
    event_type = "order.completed.v1",
    aggregate_id = order_id,
    aggregate_type = "Order",
    occurred_at = occurred_at,
    event_id = event_id
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFailed {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub attempts: u32,
    pub occurred_at: Timestamp,
}

domain_event!(
    OrderFailed,
    event_type = "order.failed.v1",
    aggregate_id = order_id,
    aggregate_type = "Order",
    occurred_at = occurred_at,
    event_id = event_id
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRefunded {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: Timestamp,
}

domain_event!(
    OrderRefunded,
    event_type = "order.refunded.v1",
    aggregate_id = order_id,
    aggregate_type = "Order",
    occurred_at = occurred_at,
    event_id = event_id
);
