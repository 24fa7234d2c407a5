//! HandleGatewayWebhookHandler - applies processor callbacks to local state.
//!
//! # Processing Order
//!
//! 1. Resolve the tenant gateway named by the route
//! 2. Verify the signature and normalize the body (nothing is loaded before)
//! 3. Lock and reconcile transaction, order and subscription in one unit of work
//! 4. Publish notifications on a detached task after commit
//!
//! Redelivered and out-of-order callbacks are harmless: reconciliation
//! compares against current state and reports a no-op.

use std::sync::Arc;

use http::HeaderMap;
use serde::Serialize;

use crate::application::handlers::notify;
use crate::domain::foundation::{ErrorCode, EventEnvelope, EventId, GatewayCode, TenantId, Timestamp};
use crate::domain::order::{OrderCompleted, OrderFailed};
use crate::domain::reconciliation::{
    reconcile, PaymentRecord, ReconcileEffect, ReconcileOutcome, ReconcilePolicy, WebhookError,
};
use crate::domain::subscription::{SubscriptionActivated, SubscriptionPastDue, SubscriptionRenewed};
use crate::ports::{EventPublisher, GatewayResolver, PaymentLedger};

#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    pub tenant_id: TenantId,
    pub gateway_code: GatewayCode,
    /// Raw body exactly as received; signatures cover these bytes.
    pub payload: Vec<u8>,
    /// Request headers; the adapter names the one carrying its signature.
    pub headers: HeaderMap,
}

/// How a verified callback was handled. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResult {
    Processed { outcome: ReconcileOutcome },
    Duplicate,
    /// Informational event, or no local transaction carries the reference.
    Ignored { reason: String },
    /// Money captured twice for one order; needs manual follow-up.
    DuplicateCapture,
    /// Guard violation; nothing was applied.
    Rejected { reason: String },
}

pub struct HandleGatewayWebhookHandler {
    gateways: Arc<dyn GatewayResolver>,
    ledger: Arc<dyn PaymentLedger>,
    events: Arc<dyn EventPublisher>,
    policy: ReconcilePolicy,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        gateways: Arc<dyn GatewayResolver>,
        ledger: Arc<dyn PaymentLedger>,
        events: Arc<dyn EventPublisher>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            gateways,
            ledger,
            events,
            policy,
        }
    }

    pub async fn handle(&self, cmd: HandleGatewayWebhookCommand) -> Result<WebhookResult, WebhookError> {
        let tenant_id = cmd.tenant_id;
        let resolved = self
            .gateways
            .resolve(tenant_id, Some(&cmd.gateway_code))
            .await
            .map_err(|err| match err.code {
                ErrorCode::GatewayNotConfigured => {
                    WebhookError::GatewayNotConfigured(cmd.gateway_code.to_string())
                }
                _ => WebhookError::Database(err.to_string()),
            })?;

        let signature = cmd
            .headers
            .get(resolved.adapter.signature_header())
            .and_then(|value| value.to_str().ok());
        let now = Timestamp::now();

        let event = match resolved.adapter.parse_webhook(&cmd.payload, signature, now) {
            Ok(event) => event,
            Err(err) => {
                if err.is_security_relevant() {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        gateway_code = %cmd.gateway_code,
                        error = %err,
                        "Webhook failed verification"
                    );
                }
                return Err(err);
            }
        };

        if event.is_ignored() {
            tracing::debug!(gateway_code = %cmd.gateway_code, event = ?event.outcome, "Webhook event ignored");
            return Ok(WebhookResult::Ignored {
                reason: "event type not handled".to_string(),
            });
        }

        let reference = event.external_reference.clone();
        let transaction_id = event.transaction_id;
        let policy = self.policy;
        let reconciled = self
            .ledger
            .reconcile(
                tenant_id,
                &cmd.gateway_code,
                &reference,
                transaction_id,
                Box::new(move |record| reconcile(record, &event, &policy, now)),
            )
            .await
            .map_err(|err| WebhookError::Database(err.to_string()))?;

        let Some((outcome, record)) = reconciled else {
            tracing::info!(
                tenant_id = %tenant_id,
                gateway_code = %cmd.gateway_code,
                external_reference = %reference,
                "Webhook for unknown transaction"
            );
            return Ok(WebhookResult::Ignored {
                reason: WebhookError::UnknownTransaction(reference).to_string(),
            });
        };

        Ok(self.finish(outcome, &record, now))
    }

    fn finish(&self, outcome: ReconcileOutcome, record: &PaymentRecord, now: Timestamp) -> WebhookResult {
        let tx = &record.transaction;
        match outcome {
            ReconcileOutcome::Applied { .. } => {
                tracing::info!(
                    tenant_id = %tx.tenant_id,
                    order_id = %tx.order_id,
                    transaction_id = %tx.id,
                    transaction_status = %tx.status,
                    order_status = %record.order.status,
                    "Webhook reconciled"
                );
                let envelopes = notifications(outcome.effects(), record, now);
                notify::spawn_publish(self.events.clone(), envelopes);
                WebhookResult::Processed { outcome }
            }
            ReconcileOutcome::AlreadyApplied | ReconcileOutcome::Stale => {
                tracing::debug!(transaction_id = %tx.id, "Webhook already reflected");
                WebhookResult::Duplicate
            }
            ReconcileOutcome::DuplicateCapture { succeeded } => {
                tracing::error!(
                    tenant_id = %tx.tenant_id,
                    order_id = %tx.order_id,
                    transaction_id = %tx.id,
                    succeeded_transaction_id = %succeeded,
                    "Second capture for an already paid order; refund required"
                );
                WebhookResult::DuplicateCapture
            }
            ReconcileOutcome::Ignored { event_type } => WebhookResult::Ignored { reason: event_type },
            ReconcileOutcome::Rejected { reason } => {
                tracing::error!(
                    tenant_id = %tx.tenant_id,
                    order_id = %tx.order_id,
                    transaction_id = %tx.id,
                    reason = %reason,
                    "Webhook rejected by reconciliation guard"
                );
                WebhookResult::Rejected { reason }
            }
        }
    }
}

fn notifications(effects: &[ReconcileEffect], record: &PaymentRecord, now: Timestamp) -> Vec<EventEnvelope> {
    let tenant_id = record.order.tenant_id;
    let order_id = record.order.id;
    let mut envelopes = Vec::new();

    for effect in effects {
        let envelope = match effect {
            ReconcileEffect::OrderCompleted => notify::envelope(
                &OrderCompleted {
                    event_id: EventId::new(),
                    tenant_id,
                    order_id,
                    transaction_id: record.transaction.id,
                    total_amount_cents: record.order.total_amount_cents,
                    occurred_at: now,
                },
                tenant_id,
            ),
            ReconcileEffect::OrderFailed { attempts } => notify::envelope(
                &OrderFailed {
                    event_id: EventId::new(),
                    tenant_id,
                    order_id,
                    attempts: *attempts,
                    occurred_at: now,
                },
                tenant_id,
            ),
            ReconcileEffect::SubscriptionActivated { subscription_id } => {
                record.subscription.as_ref().and_then(|sub| {
                    notify::envelope(
                        &SubscriptionActivated {
                            event_id: EventId::new(),
                            tenant_id,
                            subscription_id: *subscription_id,
                            buyer_id: sub.buyer_id.clone(),
                            period_end: sub.current_period_end,
                            occurred_at: now,
                        },
                        tenant_id,
                    )
                })
            }
            ReconcileEffect::SubscriptionRenewed { subscription_id } => {
                record.subscription.as_ref().and_then(|sub| {
                    notify::envelope(
                        &SubscriptionRenewed {
                            event_id: EventId::new(),
                            tenant_id,
                            subscription_id: *subscription_id,
                            period_start: sub.current_period_start,
                            period_end: sub.current_period_end,
                            occurred_at: now,
                        },
                        tenant_id,
                    )
                })
            }
            ReconcileEffect::SubscriptionPastDue { subscription_id } => notify::envelope(
                &SubscriptionPastDue {
                    event_id: EventId::new(),
                    tenant_id,
                    subscription_id: *subscription_id,
                    occurred_at: now,
                },
                tenant_id,
            ),
            ReconcileEffect::TransactionSucceeded { .. } | ReconcileEffect::TransactionFailed { .. } => None,
        };
        envelopes.extend(envelope);
    }
    envelopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::commission::RateCommissionCalculator;
    use crate::adapters::gateways::MOCK_SIGNATURE_HEADER;
    use crate::application::handlers::payment::{AttemptKind, PaymentAttempts, PaymentSettings};
    use crate::application::handlers::test_support::{signed_callback, signed_callback_for, Harness};
    use crate::domain::catalog::BillingCycle;
    use crate::domain::order::{Order, OrderStatus, Transaction, TransactionStatus};
    use crate::domain::subscription::SubscriptionStatus;
    use crate::ports::OrderRepository;
    use http::HeaderValue;
    use serde_json::json;
    use std::time::Duration;

    fn handler(h: &Harness) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            h.gateways.clone(),
            h.store.clone(),
            h.events.clone(),
            ReconcilePolicy::default(),
        )
    }

    async fn pay(h: &Harness, order: &Order) -> String {
        let attempts = PaymentAttempts::new(
            h.store.clone(),
            h.store.clone(),
            h.gateways.clone(),
            Arc::new(RateCommissionCalculator::new(0, 0)),
            PaymentSettings::default(),
        );
        let kind = if order.status == OrderStatus::Pending {
            AttemptKind::First
        } else {
            AttemptKind::Retry
        };
        attempts
            .run(h.tenant, order.id, None, json!({}), kind)
            .await
            .unwrap()
            .transaction
            .external_reference
            .unwrap()
    }

    fn command(h: &Harness, callback: (Vec<u8>, String)) -> HandleGatewayWebhookCommand {
        let (payload, signature) = callback;
        let mut headers = HeaderMap::new();
        headers.insert(MOCK_SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        HandleGatewayWebhookCommand {
            tenant_id: h.tenant,
            gateway_code: h.code.clone(),
            payload,
            headers,
        }
    }

    async fn order_status(h: &Harness, order: &Order) -> OrderStatus {
        OrderRepository::find_by_id(h.store.as_ref(), h.tenant, order.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    async fn wait_for_events(h: &Harness, count: usize) {
        for _ in 0..50 {
            if h.events.event_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Success confirmations
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn success_completes_order_and_notifies() {
        let h = Harness::new().await;
        let order = h.course_order(2).await;
        let reference = pay(&h, &order).await;

        let result = handler(&h)
            .handle(command(&h, signed_callback(&reference, "succeeded", Some(5_500))))
            .await
            .unwrap();

        assert!(matches!(result, WebhookResult::Processed { .. }));
        assert_eq!(order_status(&h, &order).await, OrderStatus::Completed);
        wait_for_events(&h, 1).await;
        assert!(h.events.has_event("order.completed.v1"));
    }

    #[tokio::test]
    async fn redelivered_success_is_a_no_op() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let reference = pay(&h, &order).await;
        let handler = handler(&h);

        handler
            .handle(command(&h, signed_callback(&reference, "succeeded", None)))
            .await
            .unwrap();
        let again = handler
            .handle(command(&h, signed_callback(&reference, "succeeded", None)))
            .await
            .unwrap();

        assert_eq!(again, WebhookResult::Duplicate);
        wait_for_events(&h, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.events.events_of_type("order.completed.v1").len(), 1);
    }

    #[tokio::test]
    async fn subscription_payment_creates_active_subscription() {
        let h = Harness::new().await;
        let order = h.plan_order(BillingCycle::Monthly).await;
        let reference = pay(&h, &order).await;

        handler(&h)
            .handle(command(&h, signed_callback(&reference, "succeeded", Some(3_000))))
            .await
            .unwrap();

        let subs = h.store.subscriptions_for_order(order.id).await;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, SubscriptionStatus::Active);
        assert_eq!(subs[0].amount_cents, 3_000);
        wait_for_events(&h, 2).await;
        assert!(h.events.has_event("subscription.activated.v1"));
    }

    #[tokio::test]
    async fn amount_mismatch_is_rejected_without_changes() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let reference = pay(&h, &order).await;

        let result = handler(&h)
            .handle(command(&h, signed_callback(&reference, "succeeded", Some(1))))
            .await
            .unwrap();

        assert!(matches!(result, WebhookResult::Rejected { .. }));
        assert_eq!(order_status(&h, &order).await, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn confirmation_ahead_of_acceptance_is_matched_by_attempt_id() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let attempt = Transaction::initiate(
            h.tenant,
            order.id,
            h.code.clone(),
            1,
            order.total_amount_cents,
            None,
            Timestamp::now(),
        );
        h.store.begin_attempt(&attempt).await.unwrap();

        let result = handler(&h)
            .handle(command(&h, signed_callback_for(attempt.id, "mock_ref_1", "succeeded")))
            .await
            .unwrap();
        assert!(matches!(result, WebhookResult::Processed { .. }));

        let (tx, after) = h
            .store
            .record_accepted(h.tenant, attempt.id, "mock_ref_1".to_string(), json!({}), Timestamp::now())
            .await
            .unwrap();
        assert_eq!(after.status, OrderStatus::Completed);
        assert_eq!(tx.status, TransactionStatus::Succeeded);
        assert_eq!(tx.external_reference.as_deref(), Some("mock_ref_1"));
    }

    #[tokio::test]
    async fn attempt_id_does_not_override_a_bound_reference() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let reference = pay(&h, &order).await;
        let attempts = PaymentLedger::list_for_order(h.store.as_ref(), h.tenant, order.id)
            .await
            .unwrap();

        let result = handler(&h)
            .handle(command(&h, signed_callback_for(attempts[0].id, "other_ref", "succeeded")))
            .await
            .unwrap();

        assert!(matches!(result, WebhookResult::Ignored { .. }));
        assert_eq!(order_status(&h, &order).await, OrderStatus::Processing);
        assert_ne!(reference, "other_ref");
    }

    // ════════════════════════════════════════════════════════════════════
    // Failure confirmations
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failures_up_to_the_limit_fail_the_order() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let handler = handler(&h);

        for attempt in 1..=3 {
            let current = OrderRepository::find_by_id(h.store.as_ref(), h.tenant, order.id)
                .await
                .unwrap()
                .unwrap();
            let reference = pay(&h, &current).await;
            handler
                .handle(command(&h, signed_callback(&reference, "failed", None)))
                .await
                .unwrap();
            let expected = if attempt < 3 {
                OrderStatus::Processing
            } else {
                OrderStatus::Failed
            };
            assert_eq!(order_status(&h, &order).await, expected);
        }

        wait_for_events(&h, 1).await;
        assert!(h.events.has_event("order.failed.v1"));
    }

    #[tokio::test]
    async fn late_failure_after_success_is_stale() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let reference = pay(&h, &order).await;
        let handler = handler(&h);
        handler
            .handle(command(&h, signed_callback(&reference, "succeeded", None)))
            .await
            .unwrap();

        let result = handler
            .handle(command(&h, signed_callback(&reference, "failed", None)))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Duplicate);
        let tx = PaymentLedger::list_for_order(h.store.as_ref(), h.tenant, order.id)
            .await
            .unwrap();
        assert_eq!(tx[0].status, TransactionStatus::Succeeded);
    }

    // ════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_signature_is_rejected_before_any_change() {
        let h = Harness::new().await;
        let order = h.course_order(1).await;
        let reference = pay(&h, &order).await;
        let (payload, _) = signed_callback(&reference, "succeeded", None);

        let err = handler(&h)
            .handle(command(&h, (payload, "deadbeef".to_string())))
            .await
            .unwrap_err();

        assert_eq!(err, WebhookError::InvalidSignature);
        assert_eq!(order_status(&h, &order).await, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let h = Harness::new().await;
        let (payload, _) = signed_callback("mock_ref_1", "succeeded", None);
        let mut cmd = command(&h, (payload, String::new()));
        cmd.headers = HeaderMap::new();

        let err = handler(&h).handle(cmd).await.unwrap_err();
        assert_eq!(err, WebhookError::InvalidSignature);
    }

    #[tokio::test]
    async fn unknown_reference_is_acknowledged() {
        let h = Harness::new().await;

        let result = handler(&h)
            .handle(command(&h, signed_callback("never_issued", "succeeded", None)))
            .await
            .unwrap();

        assert!(matches!(result, WebhookResult::Ignored { .. }));
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_not_found() {
        let h = Harness::new().await;
        let mut cmd = command(&h, signed_callback("x", "succeeded", None));
        cmd.gateway_code = GatewayCode::new("other").unwrap();

        let err = handler(&h).handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::GatewayNotConfigured(_)));
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }
}
