//! CheckoutHandler - creates the order and its first payment attempt.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::application::handlers::order::{CreateOrderCommand, CreateOrderHandler};

use super::{AttemptKind, PaymentAttemptResult, PaymentAttempts, PaymentError};

#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub order: CreateOrderCommand,
    pub client_payload: JsonValue,
}

/// When the charge is refused the order is kept, still pending, and can be
/// paid later through the payment endpoints.
pub struct CheckoutHandler {
    orders: Arc<CreateOrderHandler>,
    attempts: Arc<PaymentAttempts>,
}

impl CheckoutHandler {
    pub fn new(orders: Arc<CreateOrderHandler>, attempts: Arc<PaymentAttempts>) -> Self {
        Self { orders, attempts }
    }

    pub async fn handle(&self, cmd: CheckoutCommand) -> Result<PaymentAttemptResult, PaymentError> {
        let gateway_code = cmd.order.gateway_code.clone();
        let order = self.orders.handle(cmd.order).await?;
        self.attempts
            .run(
                order.tenant_id,
                order.id,
                gateway_code,
                cmd.client_payload,
                AttemptKind::First,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::commission::RateCommissionCalculator;
    use crate::application::handlers::payment::PaymentSettings;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::foundation::{BuyerId, ErrorCode};
    use crate::domain::gateway::GatewayError;
    use crate::domain::order::test_support::{billing, line};
    use crate::domain::order::{OrderStatus, OrderType};
    use crate::ports::PaymentLedger;
    use serde_json::json;

    fn handler(h: &Harness) -> CheckoutHandler {
        CheckoutHandler::new(
            Arc::new(CreateOrderHandler::new(h.store.clone(), h.store.clone(), h.store.clone())),
            Arc::new(PaymentAttempts::new(
                h.store.clone(),
                h.store.clone(),
                h.gateways.clone(),
                Arc::new(RateCommissionCalculator::new(1_000, 1_600)),
                PaymentSettings::default(),
            )),
        )
    }

    fn command(h: &Harness, quantity: u32) -> CheckoutCommand {
        CheckoutCommand {
            order: CreateOrderCommand {
                tenant_id: h.tenant,
                buyer_id: BuyerId::new("buyer-1").unwrap(),
                order_type: OrderType::OneTime,
                lines: vec![line(&h.course, quantity)],
                billing: billing(),
                gateway_code: None,
                renews: None,
            },
            client_payload: json!({}),
        }
    }

    #[tokio::test]
    async fn checkout_returns_canonical_payment_for_new_order() {
        let h = Harness::new().await;

        let result = handler(&h).handle(command(&h, 2)).await.unwrap();

        assert_eq!(result.payment.kind(), "checkout_url");
        assert_eq!(result.order.total_amount_cents, 5_500);
        assert_eq!(result.order.status, OrderStatus::Processing);
        assert_eq!(result.transaction.split.unwrap().net_to_merchant_cents, 4_070);
    }

    #[tokio::test]
    async fn refused_checkout_keeps_pending_order() {
        let h = Harness::new().await;
        h.adapter.fail_next(GatewayError::credentials_invalid("bad key"));

        let err = handler(&h).handle(command(&h, 1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GatewayCredentialsInvalid);

        let charge = &h.adapter.charges()[0];
        let order_id = charge.order_id.parse().unwrap();
        let attempts = h.store.list_for_order(h.tenant, order_id).await.unwrap();
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test]
    async fn invalid_order_never_reaches_gateway() {
        let h = Harness::new().await;

        let err = handler(&h).handle(command(&h, 0)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(h.adapter.charge_count(), 0);
    }
}
