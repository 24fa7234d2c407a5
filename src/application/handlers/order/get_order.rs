//! GetOrderHandler - order snapshot with its attempt history.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, TenantId};
use crate::domain::order::{Order, Transaction};
use crate::ports::{OrderRepository, PaymentLedger};

#[derive(Debug, Clone)]
pub struct GetOrderQuery {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    /// Attempts ordered by attempt number.
    pub transactions: Vec<Transaction>,
}

pub struct GetOrderHandler {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn PaymentLedger>,
}

impl GetOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { orders, ledger }
    }

    pub async fn handle(&self, query: GetOrderQuery) -> Result<OrderView, DomainError> {
        let order = self
            .orders
            .find_by_id(query.tenant_id, query.order_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OrderNotFound,
                    format!("Order not found: {}", query.order_id),
                )
            })?;
        let transactions = self
            .ledger
            .list_for_order(query.tenant_id, query.order_id)
            .await?;
        Ok(OrderView { order, transactions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Harness;

    #[tokio::test]
    async fn view_flattens_order_fields() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = GetOrderHandler::new(h.store.clone(), h.store.clone());

        let view = handler
            .handle(GetOrderQuery {
                tenant_id: h.tenant,
                order_id: order.id,
            })
            .await
            .unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["total_amount_cents"], 2_750);
        assert_eq!(json["transactions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let h = Harness::new().await;
        let handler = GetOrderHandler::new(h.store.clone(), h.store.clone());

        let err = handler
            .handle(GetOrderQuery {
                tenant_id: h.tenant,
                order_id: OrderId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }
}
