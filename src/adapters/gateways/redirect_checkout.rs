//! Redirect-checkout adapter: processor-hosted payment pages.
//!
//! Sessions normally return a hosted checkout page. Some payment methods
//! authorize first and hand back a redirect instead; those surface as
//! `redirect_url`. Webhooks are signed with an HMAC of the raw body.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::domain::foundation::Timestamp;
use crate::domain::gateway::{CanonicalPayment, CanonicalResult, GatewayError, GatewayKind};
use crate::domain::order::Order;
use crate::domain::reconciliation::{verify_body, GatewayEvent, GatewayOutcome, WebhookError};
use crate::ports::{ChargeContext, GatewayAdapter};

use super::client::{GatewayClient, ProcessorEndpoint};

pub const SIGNATURE_HEADER: &str = "x-checkout-signature";

pub struct RedirectCheckoutAdapter {
    client: GatewayClient,
    endpoint: ProcessorEndpoint,
}

impl RedirectCheckoutAdapter {
    pub fn new(client: GatewayClient, endpoint: ProcessorEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    /// `"hosted"` (default) or `"redirect"`.
    #[serde(default)]
    flow: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutEvent {
    #[serde(default)]
    id: Option<String>,
    event: String,
    data: CheckoutEventData,
}

#[derive(Debug, Deserialize)]
struct CheckoutEventData {
    session_id: String,
    /// Echo of the `reference` sent at session creation.
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    failure_reason: Option<String>,
}

fn normalize(response: SessionResponse) -> Result<CanonicalResult, GatewayError> {
    let url = response
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| GatewayError::rejected("checkout session has no URL"))?;
    let payment = match response.flow.as_deref() {
        Some("redirect") => CanonicalPayment::RedirectUrl { redirect_url: url },
        _ => CanonicalPayment::CheckoutUrl { checkout_url: url },
    };
    Ok(CanonicalResult::new(response.id, payment))
}

fn interpret(event: CheckoutEvent) -> GatewayEvent {
    let outcome = match event.event.as_str() {
        "checkout.completed" => GatewayOutcome::Succeeded,
        "checkout.failed" | "checkout.expired" => GatewayOutcome::Failed {
            reason: event
                .data
                .failure_reason
                .unwrap_or_else(|| event.event.clone()),
        },
        other => GatewayOutcome::Ignored {
            event_type: other.to_string(),
        },
    };
    GatewayEvent {
        event_id: event.id,
        external_reference: event.data.session_id,
        transaction_id: None,
        outcome,
        amount_cents: event.data.amount,
    }
    .with_echoed_transaction(event.data.reference.as_deref())
}

#[async_trait]
impl GatewayAdapter for RedirectCheckoutAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::RedirectCheckout
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError> {
        let line_items: Vec<_> = order
            .items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "quantity": item.quantity,
                    "unit_amount": item.unit_price_cents,
                })
            })
            .collect();

        let body = json!({
            "amount": order.total_amount_cents,
            "currency": order.currency.as_str(),
            "reference": context.transaction_id.to_string(),
            "customer": {
                "email": context.buyer_email,
                "name": context.buyer_name,
            },
            "line_items": line_items,
            "success_url": context.return_url,
            "cancel_url": context.cancel_url,
            "metadata": {
                "order_id": order.id.to_string(),
                "order_number": order.order_number,
                "client": context.client_payload,
            },
        });

        let request = self
            .client
            .http()
            .post(self.endpoint.url("/checkout/sessions"))
            .bearer_auth(self.endpoint.credentials.api_key.expose_secret())
            .header("Idempotency-Key", context.transaction_id.to_string())
            .json(&body);

        let response: SessionResponse = self.client.send_json(request).await?;
        normalize(response)
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        _now: Timestamp,
    ) -> Result<GatewayEvent, WebhookError> {
        let signature = signature.ok_or(WebhookError::InvalidSignature)?;
        verify_body(
            self.endpoint.credentials.signing_secret.expose_secret().as_bytes(),
            payload,
            signature,
        )?;

        let event: CheckoutEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(interpret(event))
    }
}
