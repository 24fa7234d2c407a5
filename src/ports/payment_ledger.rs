//! Payment ledger port - transaction bookkeeping and webhook reconciliation.
//!
//! Each method is one unit of work. None of them is held open across a
//! gateway call: the coordinator begins an attempt, calls the gateway with
//! no lock held, then records the outcome.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::foundation::{DomainError, GatewayCode, OrderId, TenantId, Timestamp, TransactionId};
use crate::domain::order::{Order, Transaction};
use crate::domain::reconciliation::{PaymentRecord, ReconcileOutcome};

/// Decision applied to a locked [`PaymentRecord`].
pub type ReconcileFn = Box<dyn FnOnce(&mut PaymentRecord) -> ReconcileOutcome + Send>;

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Inserts a new `initiated` attempt.
    ///
    /// # Errors
    ///
    /// - `PaymentInFlight` if another attempt with the same number exists
    async fn begin_attempt(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Attempts for an order, oldest first.
    async fn list_for_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Vec<Transaction>, DomainError>;

    /// Locks the attempt and its order, then applies
    /// [`record_acceptance`](crate::domain::order::record_acceptance).
    async fn record_accepted(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        external_reference: String,
        payload: JsonValue,
        now: Timestamp,
    ) -> Result<(Transaction, Order), DomainError>;

    /// Marks an attempt failed after a synchronous gateway error.
    /// The order is left untouched.
    async fn record_rejected(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        detail: JsonValue,
        now: Timestamp,
    ) -> Result<Transaction, DomainError>;

    /// Locks the attempt matching `external_reference`, its order and any
    /// linked subscription, runs `decide`, and persists the record when the
    /// outcome is applied.
    ///
    /// When no attempt carries the reference yet, an attempt `transaction_id`
    /// with no reference is used instead and the reference is bound to it in
    /// the same unit of work.
    ///
    /// Returns `None` when neither matches.
    async fn reconcile(
        &self,
        tenant_id: TenantId,
        gateway_code: &GatewayCode,
        external_reference: &str,
        transaction_id: Option<TransactionId>,
        decide: ReconcileFn,
    ) -> Result<Option<(ReconcileOutcome, PaymentRecord)>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn PaymentLedger) {}
}
