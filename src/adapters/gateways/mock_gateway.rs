//! Mock gateway for handler and integration tests.
//!
//! Supports:
//! - A configurable canonical result or error per charge
//! - Call tracking
//! - Body-HMAC webhooks with a small JSON shape:
//!   `{"reference": "...", "status": "succeeded" | "failed", "amount": 5500, "reason": "...",
//!   "transaction_id": "..."}`

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::foundation::{DomainError, ErrorCode, GatewayCode, TenantId, Timestamp};
use crate::domain::gateway::{CanonicalPayment, CanonicalResult, GatewayError, GatewayKind};
use crate::domain::order::Order;
use crate::domain::reconciliation::{verify_body, GatewayEvent, GatewayOutcome, WebhookError};
use crate::ports::{ChargeContext, GatewayAdapter, GatewayResolver, ResolvedGateway};

pub const MOCK_SIGNATURE_HEADER: &str = "x-mock-signature";

/// A recorded `charge` call.
#[derive(Debug, Clone)]
pub struct RecordedCharge {
    pub order_id: String,
    pub amount_cents: i64,
    pub context: ChargeContext,
}

#[derive(Default)]
struct MockState {
    next_error: Option<GatewayError>,
    charges: Vec<RecordedCharge>,
    sequence: u32,
}

/// Gateway adapter that never leaves the process.
pub struct MockGatewayAdapter {
    kind: GatewayKind,
    signing_secret: String,
    state: Mutex<MockState>,
}

impl MockGatewayAdapter {
    pub fn new(kind: GatewayKind, signing_secret: impl Into<String>) -> Self {
        Self {
            kind,
            signing_secret: signing_secret.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Fails the next `charge` with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    pub fn charges(&self) -> Vec<RecordedCharge> {
        self.state().charges.clone()
    }

    pub fn charge_count(&self) -> usize {
        self.state().charges.len()
    }

    /// Reference the n-th (1-based) successful charge was given.
    pub fn reference_for(sequence: u32) -> String {
        format!("mock_ref_{}", sequence)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn payment_for(&self, reference: &str) -> CanonicalPayment {
        let url = format!("https://mock.gateway.test/pay/{}", reference);
        match self.kind {
            GatewayKind::CardRail => CanonicalPayment::ClientSecret {
                client_secret: format!("{}_secret", reference),
                publishable_key: Some("pk_mock".to_string()),
            },
            GatewayKind::RedirectCheckout => CanonicalPayment::CheckoutUrl { checkout_url: url },
            GatewayKind::MobileMoney => CanonicalPayment::PaymentLinks {
                payment_links: vec![crate::domain::gateway::PaymentLink {
                    channel: "whatsapp".to_string(),
                    url,
                }],
            },
            GatewayKind::PaymentLink => CanonicalPayment::PaymentUrl { payment_url: url },
        }
    }
}

#[derive(Debug, Deserialize)]
struct MockEvent {
    reference: String,
    #[serde(default)]
    transaction_id: Option<String>,
    status: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    reason: Option<String>,
}

#[async_trait]
impl GatewayAdapter for MockGatewayAdapter {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    fn signature_header(&self) -> &'static str {
        MOCK_SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError> {
        let mut state = self.state();
        state.charges.push(RecordedCharge {
            order_id: order.id.to_string(),
            amount_cents: order.total_amount_cents,
            context: context.clone(),
        });
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        state.sequence += 1;
        let reference = Self::reference_for(state.sequence);
        drop(state);

        let payment = self.payment_for(&reference);
        Ok(CanonicalResult::new(reference, payment))
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        _now: Timestamp,
    ) -> Result<GatewayEvent, WebhookError> {
        let signature = signature.ok_or(WebhookError::InvalidSignature)?;
        verify_body(self.signing_secret.as_bytes(), payload, signature)?;

        let event: MockEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let outcome = match event.status.as_str() {
            "succeeded" => GatewayOutcome::Succeeded,
            "failed" => GatewayOutcome::Failed {
                reason: event.reason.unwrap_or_else(|| "failed".to_string()),
            },
            other => GatewayOutcome::Ignored {
                event_type: other.to_string(),
            },
        };
        Ok(GatewayEvent {
            event_id: None,
            external_reference: event.reference,
            transaction_id: None,
            outcome,
            amount_cents: event.amount,
        }
        .with_echoed_transaction(event.transaction_id.as_deref()))
    }
}

/// Resolver over a fixed set of adapters, keyed per tenant.
#[derive(Default)]
pub struct MockGatewayResolver {
    gateways: Mutex<HashMap<(TenantId, GatewayCode), Arc<dyn GatewayAdapter>>>,
    defaults: Mutex<HashMap<TenantId, GatewayCode>>,
}

impl MockGatewayResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter`; the first gateway of a tenant becomes its default.
    pub fn register(&self, tenant_id: TenantId, code: GatewayCode, adapter: Arc<dyn GatewayAdapter>) {
        self.defaults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(tenant_id)
            .or_insert_with(|| code.clone());
        self.gateways
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((tenant_id, code), adapter);
    }
}

#[async_trait]
impl GatewayResolver for MockGatewayResolver {
    async fn resolve(
        &self,
        tenant_id: TenantId,
        code: Option<&GatewayCode>,
    ) -> Result<ResolvedGateway, DomainError> {
        let code = match code {
            Some(code) => code.clone(),
            None => self
                .defaults
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(&tenant_id)
                .cloned()
                .ok_or_else(|| {
                    DomainError::new(ErrorCode::GatewayNotConfigured, "No default gateway is configured")
                })?,
        };
        let adapter = self
            .gateways
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(tenant_id, code.clone()))
            .cloned()
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::GatewayNotConfigured,
                    format!("Gateway '{}' is not configured or is disabled", code),
                )
            })?;
        Ok(ResolvedGateway {
            kind: adapter.kind(),
            code,
            adapter,
        })
    }
}
