//! Reconciliation of a verified gateway event against local state.
//!
//! `reconcile` is a pure function of the locked record and the event. It is
//! safe under at-least-once, out-of-order delivery because every branch first
//! compares current state and returns a no-op outcome when the event is
//! already reflected. Event ids are never relied on.

use serde::Serialize;
use serde_json::json;

use crate::domain::foundation::{SubscriptionId, Timestamp, TransactionId};
use crate::domain::order::{Order, OrderStatus, Transaction, TransactionStatus};
use crate::domain::subscription::{NewSubscription, ProductSubscription, SubscriptionStatus};

use super::{GatewayEvent, GatewayOutcome};

/// Rows locked for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub transaction: Transaction,
    pub order: Order,
    /// Total attempts recorded for the order, including this one.
    pub attempt_count: u32,
    /// Another attempt of the same order that already succeeded.
    pub succeeded_sibling: Option<TransactionId>,
    /// Subscription the order renews, or the one created by this reconciliation.
    pub subscription: Option<ProductSubscription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Attempts allowed before a failed confirmation fails the order.
    pub max_payment_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_payment_attempts: 3,
        }
    }
}

/// State changes applied by a reconciliation; drives notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ReconcileEffect {
    TransactionSucceeded { transaction_id: TransactionId },
    TransactionFailed { transaction_id: TransactionId, retries_remain: bool },
    OrderCompleted,
    OrderFailed { attempts: u32 },
    SubscriptionActivated { subscription_id: SubscriptionId },
    SubscriptionRenewed { subscription_id: SubscriptionId },
    SubscriptionPastDue { subscription_id: SubscriptionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Record changed; persist it.
    Applied { effects: Vec<ReconcileEffect> },
    /// The event is already reflected.
    AlreadyApplied,
    /// A failure reported after this attempt already succeeded.
    Stale,
    /// Money was captured by a second attempt of an already-paid order.
    DuplicateCapture { succeeded: TransactionId },
    /// Informational event.
    Ignored { event_type: String },
    /// Guard violation; nothing is applied.
    Rejected { reason: String },
}

impl ReconcileOutcome {
    /// True when the record must be written back.
    pub fn is_applied(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied { .. })
    }

    pub fn effects(&self) -> &[ReconcileEffect] {
        match self {
            ReconcileOutcome::Applied { effects } => effects,
            _ => &[],
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        ReconcileOutcome::Rejected {
            reason: reason.into(),
        }
    }
}

/// Applies `event` to `record`.
///
/// `record` is modified only when the outcome is `Applied`; every other
/// outcome leaves it exactly as it was.
pub fn reconcile(
    record: &mut PaymentRecord,
    event: &GatewayEvent,
    policy: &ReconcilePolicy,
    now: Timestamp,
) -> ReconcileOutcome {
    let mut next = record.clone();
    let outcome = match &event.outcome {
        GatewayOutcome::Succeeded => apply_success(&mut next, event, now),
        GatewayOutcome::Failed { reason } => apply_failure(&mut next, reason, policy, now),
        GatewayOutcome::Ignored { event_type } => ReconcileOutcome::Ignored {
            event_type: event_type.clone(),
        },
    };
    if outcome.is_applied() {
        *record = next;
    }
    outcome
}

fn apply_success(record: &mut PaymentRecord, event: &GatewayEvent, now: Timestamp) -> ReconcileOutcome {
    if record.transaction.status == TransactionStatus::Succeeded {
        return ReconcileOutcome::AlreadyApplied;
    }
    if let Some(succeeded) = record.succeeded_sibling {
        if succeeded != record.transaction.id {
            return ReconcileOutcome::DuplicateCapture { succeeded };
        }
    }
    if let Some(amount) = event.amount_cents {
        if amount != record.order.total_amount_cents {
            return ReconcileOutcome::rejected(format!(
                "captured amount {} does not match order total {}",
                amount, record.order.total_amount_cents
            ));
        }
    }

    let mut effects = Vec::new();

    if let Err(err) = record.transaction.succeed(now) {
        return ReconcileOutcome::rejected(err.to_string());
    }
    effects.push(ReconcileEffect::TransactionSucceeded {
        transaction_id: record.transaction.id,
    });

    match record.order.advance_to(OrderStatus::Completed, now) {
        Ok(true) => effects.push(ReconcileEffect::OrderCompleted),
        Ok(false) => {}
        Err(err) => return ReconcileOutcome::rejected(err.to_string()),
    }

    if record.order.is_subscription() {
        match activate_subscription(record, now) {
            Ok(effect) => effects.push(effect),
            Err(reason) => return ReconcileOutcome::rejected(reason),
        }
    }

    ReconcileOutcome::Applied { effects }
}

fn activate_subscription(record: &mut PaymentRecord, now: Timestamp) -> Result<ReconcileEffect, String> {
    if let Some(subscription) = record.subscription.as_mut() {
        let was_trial = subscription.status == SubscriptionStatus::Trial;
        subscription
            .activate_or_renew(now)
            .map_err(|err| err.to_string())?;
        return Ok(if was_trial {
            ReconcileEffect::SubscriptionActivated {
                subscription_id: subscription.id,
            }
        } else {
            ReconcileEffect::SubscriptionRenewed {
                subscription_id: subscription.id,
            }
        });
    }

    let order = &record.order;
    let line = order
        .subscription_line()
        .ok_or_else(|| "subscription order has no plan line".to_string())?;
    let cycle = line.subscription.unwrap_or_default();
    let subscription = ProductSubscription::activate_new(
        NewSubscription {
            tenant_id: order.tenant_id,
            buyer_id: order.buyer_id.clone(),
            product_id: line.product_id,
            order_id: Some(order.id),
            billing_cycle: cycle,
            amount_cents: line.unit_price_cents,
            currency: order.currency.clone(),
        },
        now,
    );
    let effect = ReconcileEffect::SubscriptionActivated {
        subscription_id: subscription.id,
    };
    record.order.subscription_id = Some(subscription.id);
    record.subscription = Some(subscription);
    Ok(effect)
}

fn apply_failure(
    record: &mut PaymentRecord,
    reason: &str,
    policy: &ReconcilePolicy,
    now: Timestamp,
) -> ReconcileOutcome {
    match record.transaction.status {
        TransactionStatus::Failed => return ReconcileOutcome::AlreadyApplied,
        TransactionStatus::Succeeded => return ReconcileOutcome::Stale,
        TransactionStatus::Initiated | TransactionStatus::Pending => {}
    }

    let mut effects = Vec::new();
    if let Err(err) = record
        .transaction
        .fail(json!({ "reason": reason }), now)
    {
        return ReconcileOutcome::rejected(err.to_string());
    }

    let retries_remain = record.attempt_count < policy.max_payment_attempts;
    effects.push(ReconcileEffect::TransactionFailed {
        transaction_id: record.transaction.id,
        retries_remain,
    });

    if !retries_remain && record.order.status == OrderStatus::Processing {
        if let Err(err) = record.order.transition(OrderStatus::Failed, now) {
            return ReconcileOutcome::rejected(err.to_string());
        }
        effects.push(ReconcileEffect::OrderFailed {
            attempts: record.attempt_count,
        });
    }

    if let Some(subscription) = record.subscription.as_mut() {
        if subscription.status == SubscriptionStatus::Active {
            if let Err(err) = subscription.mark_past_due(now) {
                return ReconcileOutcome::rejected(err.to_string());
            }
            effects.push(ReconcileEffect::SubscriptionPastDue {
                subscription_id: subscription.id,
            });
        }
    }

    ReconcileOutcome::Applied { effects }
}
