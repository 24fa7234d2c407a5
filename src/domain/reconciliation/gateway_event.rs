//! Processor callbacks normalized to one shape.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::TransactionId;

/// What the processor says happened to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GatewayOutcome {
    Succeeded,
    Failed { reason: String },
    /// Informational event with no bearing on local state.
    Ignored { event_type: String },
}

/// A verified, normalized webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Processor event id, when the processor provides a stable one.
    pub event_id: Option<String>,
    /// Matches `Transaction::external_reference`.
    pub external_reference: String,
    /// Our attempt id echoed back by the processor. Locates the attempt when
    /// the callback overtakes the write of its reference.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    pub outcome: GatewayOutcome,
    /// Amount the processor captured, in minor units, if reported.
    pub amount_cents: Option<i64>,
}

impl GatewayEvent {
    pub fn succeeded(reference: impl Into<String>) -> Self {
        Self {
            event_id: None,
            external_reference: reference.into(),
            transaction_id: None,
            outcome: GatewayOutcome::Succeeded,
            amount_cents: None,
        }
    }

    pub fn failed(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            event_id: None,
            external_reference: reference.into(),
            transaction_id: None,
            outcome: GatewayOutcome::Failed {
                reason: reason.into(),
            },
            amount_cents: None,
        }
    }

    pub fn with_amount(mut self, amount_cents: i64) -> Self {
        self.amount_cents = Some(amount_cents);
        self
    }

    /// Parses the echoed id; anything that is not one of ours is dropped.
    pub fn with_echoed_transaction(mut self, raw: Option<&str>) -> Self {
        self.transaction_id = raw.and_then(|raw| raw.trim().parse().ok());
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.outcome, GatewayOutcome::Ignored { .. })
    }
}
