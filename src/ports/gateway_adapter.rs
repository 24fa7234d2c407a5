//! GatewayAdapter port - one implementation per processor family.
//!
//! Every adapter returns the same canonical envelope, so the payment
//! coordinator drives any processor without per-processor branching.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::foundation::{DomainError, GatewayCode, TenantId, Timestamp, TransactionId};
use crate::domain::gateway::{CanonicalResult, GatewayError, GatewayKind};
use crate::domain::order::Order;
use crate::domain::reconciliation::{GatewayEvent, WebhookError};

/// Per-attempt data passed alongside the order.
#[derive(Debug, Clone)]
pub struct ChargeContext {
    /// Sent to the processor as the idempotency key.
    pub transaction_id: TransactionId,
    pub attempt_number: u32,
    pub buyer_email: String,
    pub buyer_name: String,
    pub buyer_phone: Option<String>,
    pub return_url: String,
    pub cancel_url: String,
    /// Opaque client data forwarded as processor metadata.
    pub client_payload: JsonValue,
}

/// Port for a payment processor family.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// HTTP header carrying the webhook signature.
    fn signature_header(&self) -> &'static str;

    /// Asks the processor to collect `order.total_amount_cents`.
    ///
    /// Never retried internally; a failed attempt is retried by the buyer
    /// through a new transaction.
    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError>;

    /// Verifies the signature, then normalizes the callback body.
    ///
    /// Must not parse anything before verification succeeds.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: Timestamp,
    ) -> Result<GatewayEvent, WebhookError>;
}

/// A tenant gateway ready to use.
#[derive(Clone)]
pub struct ResolvedGateway {
    pub code: GatewayCode,
    pub kind: GatewayKind,
    pub adapter: Arc<dyn GatewayAdapter>,
}

impl std::fmt::Debug for ResolvedGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedGateway")
            .field("code", &self.code)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Resolves tenant gateway codes to adapters.
#[async_trait]
pub trait GatewayResolver: Send + Sync {
    /// Resolves `code`, or the tenant default when `code` is `None`.
    ///
    /// # Errors
    ///
    /// - `GatewayNotConfigured` when the setting is absent or disabled
    /// - `EncryptionError` when stored credentials cannot be decrypted
    async fn resolve(
        &self,
        tenant_id: TenantId,
        code: Option<&GatewayCode>,
    ) -> Result<ResolvedGateway, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_adapter_object_safe(_: &dyn GatewayAdapter) {}

    #[allow(dead_code)]
    fn assert_resolver_object_safe(_: &dyn GatewayResolver) {}
}
