//! TransitionOrderHandler - administrative status change (refunds).

use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventId, OrderId, TenantId, Timestamp};
use crate::domain::order::{Order, OrderRefunded, OrderStatus};
use crate::ports::{EventPublisher, OrderRepository};

use crate::application::handlers::notify;

#[derive(Debug, Clone)]
pub struct TransitionOrderCommand {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub to: OrderStatus,
}

/// Applies one legal order edge under the order's row lock.
///
/// Repeating the current status is a no-op and publishes nothing.
pub struct TransitionOrderHandler {
    orders: Arc<dyn OrderRepository>,
    events: Arc<dyn EventPublisher>,
}

impl TransitionOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { orders, events }
    }

    pub async fn handle(&self, cmd: TransitionOrderCommand) -> Result<Order, DomainError> {
        let now = Timestamp::now();
        let (order, changed) = self
            .orders
            .transition(cmd.tenant_id, cmd.order_id, cmd.to, now)
            .await?;

        if changed {
            tracing::info!(
                tenant_id = %order.tenant_id,
                order_id = %order.id,
                status = %order.status,
                "Order status changed"
            );
            if order.status == OrderStatus::Refunded {
                let event = OrderRefunded {
                    event_id: EventId::new(),
                    tenant_id: order.tenant_id,
                    order_id: order.id,
                    occurred_at: now,
                };
                let envelopes = notify::envelope(&event, order.tenant_id).into_iter().collect();
                notify::publish(self.events.as_ref(), envelopes).await;
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::foundation::ErrorCode;

    fn handler(h: &Harness) -> TransitionOrderHandler {
        TransitionOrderHandler::new(h.store.clone(), h.events.clone())
    }

    async fn completed_order(h: &Harness) -> Order {
        let order = h.course_order(1).await;
        for to in [OrderStatus::Processing, OrderStatus::Completed] {
            OrderRepository::transition(h.store.as_ref(), h.tenant, order.id, to, Timestamp::now())
                .await
                .unwrap();
        }
        order
    }

    fn refund(h: &Harness, order_id: OrderId) -> TransitionOrderCommand {
        TransitionOrderCommand {
            tenant_id: h.tenant,
            order_id,
            to: OrderStatus::Refunded,
        }
    }

    #[tokio::test]
    async fn refund_of_completed_order_publishes_once() {
        let h = Harness::new().await;
        let order = completed_order(&h).await;

        let refunded = handler(&h).handle(refund(&h, order.id)).await.unwrap();
        handler(&h).handle(refund(&h, order.id)).await.unwrap();

        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(h.events.events_of_type("order.refunded.v1").len(), 1);
    }

    #[tokio::test]
    async fn refund_of_pending_order_is_illegal() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;

        let err = handler(&h).handle(refund(&h, order.id)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::IllegalOrderTransition);
        assert_eq!(h.events.event_count(), 0);
    }
}
