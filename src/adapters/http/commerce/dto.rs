//! Request and response bodies for the commerce API.

use std::collections::HashMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::catalog::BillingCycle;
use crate::domain::foundation::{DomainError, GatewayCode, ProductId, SubscriptionId};
use crate::domain::gateway::{GatewayKind, GatewayMode};
use crate::domain::order::{BillingSnapshot, LineRequest, OrderType};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub order_type: OrderType,
    pub lines: Vec<LineRequest>,
    pub billing: BillingSnapshot,
    pub gateway_code: Option<GatewayCode>,
    /// Subscription whose next period this checkout pays.
    pub renews: Option<SubscriptionId>,
    /// Gateway-specific client input (phone number, payment method id, ...).
    #[serde(default)]
    pub payload: JsonValue,
}

/// POST /api/orders/:id/payments and /payments/retry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRequest {
    pub gateway_code: Option<GatewayCode>,
    #[serde(default)]
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(default = "default_true")]
    pub at_period_end: bool,
}

impl Default for CancelSubscriptionRequest {
    fn default() -> Self {
        Self { at_period_end: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_id: ProductId,
    pub cycle: Option<BillingCycle>,
}

/// GET /api/subscriptions/:id/proration?plan_id=&cycle=
#[derive(Debug, Clone, Deserialize)]
pub struct ProrationParams {
    pub plan_id: ProductId,
    pub cycle: Option<BillingCycle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartTrialRequest {
    pub product_id: ProductId,
    pub cycle: Option<BillingCycle>,
}

/// PUT /api/gateways/:code
///
/// Omitted secrets keep their stored values on update.
#[derive(Debug, Deserialize)]
pub struct ConfigureGatewayRequest {
    pub kind: GatewayKind,
    #[serde(default)]
    pub mode: GatewayMode,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub signing_secret: Option<SecretString>,
    pub public_key: Option<String>,
    pub merchant_id: Option<String>,
    pub api_base_url: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }
}

impl From<DomainError> for ErrorResponse {
    fn from(err: DomainError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message,
            details: err.details,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
