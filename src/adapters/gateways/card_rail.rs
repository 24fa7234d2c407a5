//! Card-rail adapter: payment intents confirmed in the browser.
//!
//! The processor returns a client secret that the buyer's browser uses to
//! confirm the card payment. Webhooks carry a timestamped signature.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::domain::gateway::{CanonicalPayment, CanonicalResult, GatewayError, GatewayKind};
use crate::domain::order::Order;
use crate::domain::reconciliation::{verify_timestamped, GatewayEvent, GatewayOutcome, WebhookError};
use crate::ports::{ChargeContext, GatewayAdapter};

use super::client::{GatewayClient, ProcessorEndpoint};

pub const SIGNATURE_HEADER: &str = "webhook-signature";

pub struct CardRailAdapter {
    client: GatewayClient,
    endpoint: ProcessorEndpoint,
    tolerance_secs: i64,
}

impl CardRailAdapter {
    pub fn new(client: GatewayClient, endpoint: ProcessorEndpoint, tolerance_secs: i64) -> Self {
        Self {
            client,
            endpoint,
            tolerance_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: CardEventData,
}

#[derive(Debug, Deserialize)]
struct CardEventData {
    object: CardIntent,
}

#[derive(Debug, Deserialize)]
struct CardIntent {
    id: String,
    #[serde(default)]
    amount_received: Option<i64>,
    #[serde(default)]
    metadata: CardMetadata,
    #[serde(default)]
    last_payment_error: Option<CardPaymentError>,
}

#[derive(Debug, Default, Deserialize)]
struct CardMetadata {
    #[serde(default)]
    transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardPaymentError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn normalize(
    response: PaymentIntentResponse,
    publishable_key: Option<String>,
) -> Result<CanonicalResult, GatewayError> {
    let client_secret = response
        .client_secret
        .ok_or_else(|| GatewayError::rejected("payment intent has no client secret"))?;
    Ok(CanonicalResult::new(
        response.id,
        CanonicalPayment::ClientSecret {
            client_secret,
            publishable_key,
        },
    ))
}

fn interpret(event: CardEvent) -> GatewayEvent {
    let intent = event.data.object;
    let outcome = match event.event_type.as_str() {
        "payment_intent.succeeded" => GatewayOutcome::Succeeded,
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            let reason = intent
                .last_payment_error
                .and_then(|e| e.code.or(e.message))
                .unwrap_or_else(|| event.event_type.clone());
            GatewayOutcome::Failed { reason }
        }
        other => GatewayOutcome::Ignored {
            event_type: other.to_string(),
        },
    };
    GatewayEvent {
        event_id: Some(event.id),
        external_reference: intent.id,
        transaction_id: None,
        outcome,
        amount_cents: intent.amount_received.filter(|amount| *amount > 0),
    }
    .with_echoed_transaction(intent.metadata.transaction_id.as_deref())
}

#[async_trait]
impl GatewayAdapter for CardRailAdapter {
    fn kind(&self) -> GatewayKind {
        GatewayKind::CardRail
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        order: &Order,
        context: &ChargeContext,
    ) -> Result<CanonicalResult, GatewayError> {
        let params = vec![
            ("amount", order.total_amount_cents.to_string()),
            ("currency", order.currency.as_str().to_ascii_lowercase()),
            ("description", order.order_number.clone()),
            ("receipt_email", context.buyer_email.clone()),
            ("metadata[order_id]", order.id.to_string()),
            ("metadata[tenant_id]", order.tenant_id.to_string()),
            ("metadata[transaction_id]", context.transaction_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let request = self
            .client
            .http()
            .post(self.endpoint.url("/v1/payment_intents"))
            .basic_auth(
                self.endpoint.credentials.api_key.expose_secret(),
                Option::<&str>::None,
            )
            .header("Idempotency-Key", context.transaction_id.to_string())
            .form(&params);

        let response: PaymentIntentResponse = self.client.send_json(request).await?;
        normalize(response, self.endpoint.credentials.public_key.clone())
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: Timestamp,
    ) -> Result<GatewayEvent, WebhookError> {
        let signature = signature.ok_or(WebhookError::InvalidSignature)?;
        verify_timestamped(
            self.endpoint.credentials.signing_secret.expose_secret().as_bytes(),
            payload,
            signature,
            now.as_unix_secs(),
            self.tolerance_secs,
        )?;

        let event: CardEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok(interpret(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::client::ProcessorCredentials;
    use crate::domain::gateway::GatewayMode;
    use crate::domain::foundation::TransactionId;
    use crate::domain::reconciliation::{sign_timestamped, DEFAULT_TOLERANCE_SECS};
    use secrecy::SecretString;
    use std::time::Duration;

    const SECRET: &str = "whsec_card_test";

    fn adapter() -> CardRailAdapter {
        CardRailAdapter::new(
            GatewayClient::new(Duration::from_secs(5)).unwrap(),
            ProcessorEndpoint {
                base_url: "http://127.0.0.1:9".to_string(),
                mode: GatewayMode::Sandbox,
                credentials: ProcessorCredentials {
                    api_key: SecretString::new("sk_test_1".to_string()),
                    signing_secret: SecretString::new(SECRET.to_string()),
                    public_key: Some("pk_test_1".to_string()),
                    merchant_id: None,
                },
            },
            DEFAULT_TOLERANCE_SECS,
        )
    }

    #[test]
    fn normalizes_to_client_secret() {
        let result = normalize(
            PaymentIntentResponse {
                id: "pi_1".to_string(),
                client_secret: Some("pi_1_secret_x".to_string()),
            },
            Some("pk_test_1".to_string()),
        )
        .unwrap();

        assert_eq!(result.external_reference, "pi_1");
        assert_eq!(result.payment.kind(), "client_secret");
    }

    #[test]
    fn missing_client_secret_is_rejected() {
        let err = normalize(
            PaymentIntentResponse {
                id: "pi_1".to_string(),
                client_secret: None,
            },
            None,
        )
        .unwrap_err();
        assert!(!err.retryable);
    }

    #[test]
    fn signed_success_event_is_parsed() {
        let body = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1","amount_received":5500}}}"#;
        let now = Timestamp::now();
        let header = sign_timestamped(SECRET.as_bytes(), now.as_unix_secs(), body).unwrap();

        let event = adapter().parse_webhook(body, Some(&header), now).unwrap();

        assert_eq!(event.external_reference, "pi_1");
        assert_eq!(event.outcome, GatewayOutcome::Succeeded);
        assert_eq!(event.amount_cents, Some(5_500));
    }

    #[test]
    fn metadata_transaction_id_is_carried() {
        let id = TransactionId::new();
        let body = format!(
            r#"{{"id":"evt_3","type":"payment_intent.succeeded","data":{{"object":{{"id":"pi_9","metadata":{{"transaction_id":"{}"}}}}}}}}"#,
            id
        );
        let now = Timestamp::now();
        let header = sign_timestamped(SECRET.as_bytes(), now.as_unix_secs(), body.as_bytes()).unwrap();

        let event = adapter().parse_webhook(body.as_bytes(), Some(&header), now).unwrap();

        assert_eq!(event.external_reference, "pi_9");
        assert_eq!(event.transaction_id, Some(id));
    }

    #[test]
    fn failure_reason_prefers_processor_code() {
        let body = br#"{"id":"evt_2","type":"payment_intent.payment_failed","data":{"object":{"id":"pi_1","last_payment_error":{"code":"card_declined","message":"Your card was declined."}}}}"#;
        let now = Timestamp::now();
        let header = sign_timestamped(SECRET.as_bytes(), now.as_unix_secs(), body).unwrap();

        let event = adapter().parse_webhook(body, Some(&header), now).unwrap();
        assert_eq!(
            event.outcome,
            GatewayOutcome::Failed {
                reason: "card_declined".to_string()
            }
        );
    }

    #[test]
    fn unsigned_or_forged_events_are_refused_before_parsing() {
        let body = b"not even json";
        let now = Timestamp::now();
        assert_eq!(
            adapter().parse_webhook(body, None, now),
            Err(WebhookError::InvalidSignature)
        );
        let forged = sign_timestamped(b"other", now.as_unix_secs(), body).unwrap();
        assert_eq!(
            adapter().parse_webhook(body, Some(&forged), now),
            Err(WebhookError::InvalidSignature)
        );
    }
}
