//! CreatePaymentHandler - first payment attempt for a pending order.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::domain::foundation::{GatewayCode, OrderId, TenantId};

use super::{AttemptKind, PaymentAttemptResult, PaymentAttempts, PaymentError};

#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    /// Overrides the order's gateway; `None` falls back to it, then to the tenant default.
    pub gateway_code: Option<GatewayCode>,
    pub client_payload: JsonValue,
}

pub struct CreatePaymentHandler {
    attempts: Arc<PaymentAttempts>,
}

impl CreatePaymentHandler {
    pub fn new(attempts: Arc<PaymentAttempts>) -> Self {
        Self { attempts }
    }

    pub async fn handle(&self, cmd: CreatePaymentCommand) -> Result<PaymentAttemptResult, PaymentError> {
        self.attempts
            .run(
                cmd.tenant_id,
                cmd.order_id,
                cmd.gateway_code,
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
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::domain::gateway::{CanonicalPayment, GatewayError};
    use crate::domain::order::{Order, OrderStatus, TransactionStatus};
    use crate::ports::{CommissionCalculator, PaymentLedger};
    use crate::domain::order::CommissionSplit;
    use serde_json::json;

    struct BrokenCalculator;

    impl CommissionCalculator for BrokenCalculator {
        fn compute_split(&self, _order: &Order) -> Result<CommissionSplit, DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "rates unavailable"))
        }
    }

    fn handler(h: &Harness, commission: Arc<dyn CommissionCalculator>) -> CreatePaymentHandler {
        CreatePaymentHandler::new(Arc::new(PaymentAttempts::new(
            h.store.clone(),
            h.store.clone(),
            h.gateways.clone(),
            commission,
            PaymentSettings::default(),
        )))
    }

    fn command(h: &Harness, order_id: OrderId) -> CreatePaymentCommand {
        CreatePaymentCommand {
            tenant_id: h.tenant,
            order_id,
            gateway_code: None,
            client_payload: json!({"locale": "en"}),
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Accepted charges
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn accepted_charge_moves_order_to_processing() {
        let h = Harness::new().await;
        let order = h.course_order(2).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(1_000, 1_600)));

        let result = handler.handle(command(&h, order.id)).await.unwrap();

        assert!(matches!(result.payment, CanonicalPayment::CheckoutUrl { .. }));
        assert_eq!(result.order.status, OrderStatus::Processing);
        assert_eq!(result.transaction.status, TransactionStatus::Pending);
        assert_eq!(result.transaction.attempt_number, 1);
        assert_eq!(result.transaction.amount_cents, 5_500);
        assert_eq!(result.transaction.external_reference.as_deref(), Some("mock_ref_1"));
        assert_eq!(result.transaction.split.unwrap().fees_cents, 550);
    }

    #[tokio::test]
    async fn response_envelope_carries_payment_type_order_and_transaction() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));

        let result = handler.handle(command(&h, order.id)).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["payment_type"], "checkout_url");
        assert!(json["checkout_url"].as_str().unwrap().contains("mock_ref_1"));
        assert_eq!(json["order"]["status"], "processing");
        assert_eq!(json["transaction"]["status"], "pending");
    }

    #[tokio::test]
    async fn charge_context_carries_billing_and_urls() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));

        let result = handler.handle(command(&h, order.id)).await.unwrap();

        let charges = h.adapter.charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].context.transaction_id, result.transaction.id);
        assert_eq!(charges[0].context.buyer_email, "ada@example.com");
        assert!(charges[0].context.return_url.contains(&order.id.to_string()));
    }

    #[tokio::test]
    async fn commission_failure_omits_split_only() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(BrokenCalculator));

        let result = handler.handle(command(&h, order.id)).await.unwrap();

        assert!(result.transaction.split.is_none());
        assert_eq!(result.order.status, OrderStatus::Processing);
    }

    // ════════════════════════════════════════════════════════════════════
    // Refusals
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn gateway_error_fails_attempt_and_keeps_order_pending() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));
        h.adapter.fail_next(GatewayError::unavailable("processor timed out"));

        let err = handler.handle(command(&h, order.id)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::GatewayUnavailable);
        let attempts = h.store.list_for_order(h.tenant, order.id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, TransactionStatus::Failed);
        assert_eq!(attempts[0].payload["failure"]["code"], "processor_unavailable");
        let stored = crate::ports::OrderRepository::find_by_id(h.store.as_ref(), h.tenant, order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_gateway_code_is_not_configured() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));
        let mut cmd = command(&h, order.id);
        cmd.gateway_code = Some(GatewayCode::new("nope").unwrap());

        let err = handler.handle(cmd).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::GatewayNotConfigured);
        assert_eq!(h.adapter.charge_count(), 0);
    }

    #[tokio::test]
    async fn order_of_another_tenant_is_not_found() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));
        let mut cmd = command(&h, order.id);
        cmd.tenant_id = TenantId::new();

        let err = handler.handle(cmd).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn second_create_on_processing_order_is_illegal() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h, Arc::new(RateCommissionCalculator::new(0, 0)));
        handler.handle(command(&h, order.id)).await.unwrap();

        let err = handler.handle(command(&h, order.id)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalOrderTransition);
        assert_eq!(h.adapter.charge_count(), 1);
    }
}
