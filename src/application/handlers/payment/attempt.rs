//! One payment attempt, shared by first payments, retries and checkout.
//!
//! # Sequence
//!
//! 1. Load the order and its attempt history; check the preconditions
//! 2. Resolve the gateway (requested code, order code, or tenant default)
//! 3. Compute the informational commission split
//! 4. Insert the `initiated` transaction in its own short unit of work
//! 5. Call the processor with nothing locked
//! 6. Book acceptance (transaction pending, order processing) or failure

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::domain::foundation::{DomainError, ErrorCode, GatewayCode, OrderId, TenantId, Timestamp};
use crate::domain::gateway::CanonicalPayment;
use crate::domain::order::{Order, OrderError, OrderStatus, Transaction, TransactionStatus};
use crate::ports::{
    ChargeContext, CommissionCalculator, GatewayResolver, OrderRepository, PaymentLedger,
};

use super::PaymentError;

/// Knobs for payment attempts.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub max_payment_attempts: u32,
    /// `{order_id}` and `{order_number}` are substituted.
    pub return_url_template: String,
    pub cancel_url_template: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            max_payment_attempts: 3,
            return_url_template: "http://localhost:3000/orders/{order_id}/complete".to_string(),
            cancel_url_template: "http://localhost:3000/orders/{order_id}/cancel".to_string(),
        }
    }
}

impl PaymentSettings {
    fn render(template: &str, order: &Order) -> String {
        template
            .replace("{order_id}", &order.id.to_string())
            .replace("{order_number}", &order.order_number)
    }
}

/// What the buyer needs to complete the payment, plus the resulting state.
///
/// Serializes as `{payment_type, <kind fields>, order, transaction}`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentAttemptResult {
    #[serde(flatten)]
    pub payment: CanonicalPayment,
    pub order: Order,
    pub transaction: Transaction,
}

/// Whether the caller starts or retries payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    First,
    Retry,
}

pub struct PaymentAttempts {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn PaymentLedger>,
    gateways: Arc<dyn GatewayResolver>,
    commission: Arc<dyn CommissionCalculator>,
    settings: PaymentSettings,
}

impl PaymentAttempts {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        ledger: Arc<dyn PaymentLedger>,
        gateways: Arc<dyn GatewayResolver>,
        commission: Arc<dyn CommissionCalculator>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            orders,
            ledger,
            gateways,
            commission,
            settings,
        }
    }

    pub async fn run(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        gateway_code: Option<GatewayCode>,
        client_payload: JsonValue,
        kind: AttemptKind,
    ) -> Result<PaymentAttemptResult, PaymentError> {
        let order = self
            .orders
            .find_by_id(tenant_id, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        let history = self.ledger.list_for_order(tenant_id, order_id).await?;
        check_preconditions(&order, &history, kind, self.settings.max_payment_attempts)?;

        let requested = gateway_code.as_ref().or(order.gateway_code.as_ref());
        let resolved = self.gateways.resolve(tenant_id, requested).await?;

        let split = match self.commission.compute_split(&order) {
            Ok(split) => Some(split),
            Err(err) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %err,
                    "Commission split unavailable; attempt recorded without it"
                );
                None
            }
        };

        let transaction = Transaction::initiate(
            tenant_id,
            order.id,
            resolved.code.clone(),
            history.len() as u32 + 1,
            order.total_amount_cents,
            split,
            Timestamp::now(),
        );
        self.ledger.begin_attempt(&transaction).await?;

        let context = ChargeContext {
            transaction_id: transaction.id,
            attempt_number: transaction.attempt_number,
            buyer_email: order.billing.email.clone(),
            buyer_name: order.billing.name.clone(),
            buyer_phone: order.billing.phone.clone(),
            return_url: PaymentSettings::render(&self.settings.return_url_template, &order),
            cancel_url: PaymentSettings::render(&self.settings.cancel_url_template, &order),
            client_payload,
        };

        match resolved.adapter.charge(&order, &context).await {
            Ok(result) => {
                let payload = serde_json::to_value(&result.payment).map_err(|e| {
                    DomainError::new(ErrorCode::InternalError, format!("Failed to encode payment: {}", e))
                })?;
                let (transaction, order) = self
                    .ledger
                    .record_accepted(
                        tenant_id,
                        transaction.id,
                        result.external_reference,
                        payload,
                        Timestamp::now(),
                    )
                    .await?;

                tracing::info!(
                    tenant_id = %tenant_id,
                    order_id = %order.id,
                    transaction_id = %transaction.id,
                    gateway_code = %resolved.code,
                    payment_type = result.payment.kind(),
                    "Payment attempt accepted by gateway"
                );

                Ok(PaymentAttemptResult {
                    payment: result.payment,
                    order,
                    transaction,
                })
            }
            Err(gateway_error) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    order_id = %order.id,
                    transaction_id = %transaction.id,
                    gateway_code = %resolved.code,
                    error = %gateway_error,
                    "Payment attempt refused by gateway"
                );
                let detail = json!({
                    "code": gateway_error.code.as_str(),
                    "message": gateway_error.message,
                    "provider_code": gateway_error.provider_code,
                });
                if let Err(err) = self
                    .ledger
                    .record_rejected(tenant_id, transaction.id, detail, Timestamp::now())
                    .await
                {
                    tracing::error!(
                        transaction_id = %transaction.id,
                        error = %err,
                        "Failed to record refused payment attempt"
                    );
                }
                if order.status == OrderStatus::Processing
                    && transaction.attempt_number >= self.settings.max_payment_attempts
                {
                    self.fail_exhausted(tenant_id, &order).await;
                }
                Err(PaymentError::Gateway(gateway_error))
            }
        }
    }

    /// Closes a processing order whose last allowed attempt was refused.
    /// A pending order has no edge to failed and stays pending.
    async fn fail_exhausted(&self, tenant_id: TenantId, order: &Order) {
        match self
            .orders
            .transition(tenant_id, order.id, OrderStatus::Failed, Timestamp::now())
            .await
        {
            Ok(_) => tracing::info!(
                tenant_id = %tenant_id,
                order_id = %order.id,
                "Order failed after its final payment attempt"
            ),
            Err(err) => tracing::error!(
                order_id = %order.id,
                error = %err,
                "Failed to close order after its final payment attempt"
            ),
        }
    }
}

fn check_preconditions(
    order: &Order,
    history: &[Transaction],
    kind: AttemptKind,
    max_attempts: u32,
) -> Result<(), PaymentError> {
    let latest = history.iter().max_by_key(|tx| tx.attempt_number);
    let open = matches!(order.status, OrderStatus::Pending | OrderStatus::Processing);

    if let Some(latest) = latest.filter(|tx| open && tx.status.is_in_flight()) {
        return Err(DomainError::new(
            ErrorCode::PaymentInFlight,
            format!("Payment attempt {} is still in progress", latest.attempt_number),
        )
        .into());
    }

    let payable = match (kind, order.status) {
        (_, OrderStatus::Pending) => true,
        (AttemptKind::Retry, OrderStatus::Processing) => {
            latest.map(|tx| tx.status == TransactionStatus::Failed).unwrap_or(false)
        }
        _ => false,
    };
    if !payable {
        return Err(OrderError::illegal(order.status, OrderStatus::Processing).into());
    }

    let attempts = history.len() as u32;
    if attempts >= max_attempts {
        return Err(PaymentError::RetryLimitExceeded {
            attempts,
            max: max_attempts,
        });
    }
    Ok(())
}
