//! RetryPaymentHandler - new attempt after a refused or failed one.
//!
//! Allowed while the order is pending, or processing with a failed latest
//! attempt. Every retry writes a new transaction row.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::domain::foundation::{GatewayCode, OrderId, TenantId};

use super::{AttemptKind, PaymentAttemptResult, PaymentAttempts, PaymentError};

#[derive(Debug, Clone)]
pub struct RetryPaymentCommand {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    /// Buyers may switch gateway on retry.
    pub gateway_code: Option<GatewayCode>,
    pub client_payload: JsonValue,
}

pub struct RetryPaymentHandler {
    attempts: Arc<PaymentAttempts>,
}

impl RetryPaymentHandler {
    pub fn new(attempts: Arc<PaymentAttempts>) -> Self {
        Self { attempts }
    }

    pub async fn handle(&self, cmd: RetryPaymentCommand) -> Result<PaymentAttemptResult, PaymentError> {
        self.attempts
            .run(
                cmd.tenant_id,
                cmd.order_id,
                cmd.gateway_code,
                cmd.client_payload,
                AttemptKind::Retry,
            )
            .await
    }
}
