//! Mobile-money adapter: collection requests delivered over messaging channels.
//!
//! A collection can be completed through several channels (WhatsApp, SMS,
//! USSD, web). Each offered channel becomes one payment link; a lone web
//! link is returned as a plain payment URL.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::domain::foundation::Timestamp;
use crate::domain::gateway::{
    CanonicalPayment, CanonicalResult, GatewayError, GatewayKind, PaymentLink,
};
use crate::domain::order::Order;
use crate::domain::reconciliation::{verify_body, GatewayEvent, GatewayOutcome, WebhookError};
use crate::ports::{ChargeContext, GatewayAdapter};

use super::client::{GatewayClient, ProcessorEndpoint};

pub const SIGNATURE_HEADER: &str = "x-collection-signature";

pub struct MobileMoneyAdapter {
    client: GatewayClient,
    endpoint: ProcessorEndpoint,
}

impl MobileMoneyAdapter {
    pub fn new(client: GatewayClient, endpoint: ProcessorEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    collection_id: String,
    #[serde(default)]
    links: Vec<PaymentLink>,
    #[serde(default)]
    payment_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionEvent {
    #[serde(default)]
    event_id: Option<String>,
    collection_id: String,
    #[serde(default)]
    external_id: Option<String>,
    status: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    reason: Option<String>,
}

fn normalize(response: CollectionResponse) -> Result<CanonicalResult, GatewayError> {
    let mut links: Vec<PaymentLink> = response
        .links
        .into_iter()
        .filter(|link| !link.url.is_empty())
        .collect();

    let payment = match links.len() {
        0 => match response.payment_url.filter(|url| !url.is_empty()) {
            Some(payment_url) => CanonicalPayment::PaymentUrl { payment_url },
            None => return Err(GatewayError::rejected("collection offers no payment channel")),
        },
        1 if links[0].channel == "web" => CanonicalPayment::PaymentUrl {
            payment_url: links.remove(0).url,
        },
        _ => CanonicalPayment::PaymentLinks {
            payment_links: links,
        },
    };
    Ok(CanonicalResult::new(response.collection_id, payment))
}

fn interpret(event: CollectionEvent) -> GatewayEvent {
    let outcome = match event.status.as_str() {
        "successful" | "completed" => GatewayOutcome::Succeeded,
        "failed" | "rejected" | "expired" => GatewayOutcome::Failed {
            reason: event.reason.unwrap_or_else(|| event.status.clone()),
        },
        other => GatewayOutcome::Ignored {
            event_type: format!("collection.{}", other),
        },
    };
    GatewayEvent {
        event_id: event.event_id,
        external_reference: event.collection_id,
        transaction_id: None,
        outcome,
        amount_cents: event.amount,
    }
    .with_echoed_transaction(event.external_id.as_deref())
}

#[async_trait]
impl GatewayAdapter for MobileMoneyAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::MobileMoney
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError> {
        let phone = context
            .buyer_phone
            .as_deref()
            .filter(|phone| !phone.trim().is_empty())
            .ok_or_else(|| GatewayError::rejected("mobile money requires a payer phone number"))?;

        let body = json!({
            "amount": order.total_amount_cents,
            "currency": order.currency.as_str(),
            "external_id": context.transaction_id.to_string(),
            "description": order.order_number,
            "payer": {
                "phone": phone,
                "name": context.buyer_name,
                "email": context.buyer_email,
            },
            "return_url": context.return_url,
        });

        let mut request = self
            .client
            .http()
            .post(self.endpoint.url("/collections"))
            .bearer_auth(self.endpoint.credentials.api_key.expose_secret())
            .header("X-Reference-Id", context.transaction_id.to_string())
            .json(&body);
        if let Some(merchant_id) = &self.endpoint.credentials.merchant_id {
            request = request.header("X-Merchant-Id", merchant_id);
        }

        let response: CollectionResponse = self.client.send_json(request).await?;
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

        let event: CollectionEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(interpret(event))
    }
}
