//! Multi-channel link adapter: one shareable payment page per attempt.

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

pub const SIGNATURE_HEADER: &str = "x-link-signature";

pub struct PaymentLinkAdapter {
    client: GatewayClient,
    endpoint: ProcessorEndpoint,
}

impl PaymentLinkAdapter {
    pub fn new(client: GatewayClient, endpoint: ProcessorEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    id: String,
    #[serde(default)]
    short_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkEvent {
    #[serde(default)]
    id: Option<String>,
    event: String,
    link_id: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    amount_paid: Option<i64>,
    #[serde(default)]
    failure_reason: Option<String>,
}

fn normalize(response: LinkResponse) -> Result<CanonicalResult, GatewayError> {
    let payment_url = response
        .short_url
        .or(response.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| GatewayError::rejected("payment link response has no URL"))?;
    Ok(CanonicalResult::new(
        response.id,
        CanonicalPayment::PaymentUrl { payment_url },
    ))
}

fn interpret(event: LinkEvent) -> GatewayEvent {
    let outcome = match event.event.as_str() {
        "link.paid" => GatewayOutcome::Succeeded,
        "link.payment_failed" | "link.expired" => GatewayOutcome::Failed {
            reason: event.failure_reason.unwrap_or_else(|| event.event.clone()),
        },
        other => GatewayOutcome::Ignored {
            event_type: other.to_string(),
        },
    };
    GatewayEvent {
        event_id: event.id,
        external_reference: event.link_id,
        transaction_id: None,
        outcome,
        amount_cents: event.amount_paid,
    }
    .with_echoed_transaction(event.reference.as_deref())
}

#[async_trait]
impl GatewayAdapter for PaymentLinkAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::PaymentLink
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError> {
        let body = json!({
            "amount": order.total_amount_cents,
            "currency": order.currency.as_str(),
            "title": order.order_number,
            "reference": context.transaction_id.to_string(),
            "customer": {
                "email": context.buyer_email,
                "name": context.buyer_name,
                "phone": context.buyer_phone,
            },
            "redirect_url": context.return_url,
            "reusable": false,
        });

        let request = self
            .client
            .http()
            .post(self.endpoint.url("/payment-links"))
            .bearer_auth(self.endpoint.credentials.api_key.expose_secret())
            .header("Idempotency-Key", context.transaction_id.to_string())
            .json(&body);

        let response: LinkResponse = self.client.send_json(request).await?;
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

        let event: LinkEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(interpret(event))
    }
}
