//! Transaction entity: one attempt to move money for an Order.
//!
//! Attempts are append-only. A retry writes a new row; earlier rows keep
//! their final status so the full attempt history survives.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{
    GatewayCode, OrderId, StateMachine, TenantId, Timestamp, TransactionId,
};

use super::{Order, OrderError, OrderStatus, TransactionStatus};

/// Informational fee/tax breakdown attached to an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub fees_cents: i64,
    pub taxes_cents: i64,
    pub net_to_merchant_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub gateway_code: GatewayCode,
    /// 1-based position in the order's attempt history.
    pub attempt_number: u32,
    /// Processor-side reference, known once the gateway accepts the request.
    pub external_reference: Option<String>,
    pub status: TransactionStatus,
    pub amount_cents: i64,
    /// Canonical result on acceptance, failure detail otherwise.
    pub payload: JsonValue,
    pub split: Option<CommissionSplit>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Transaction {
    pub fn initiate(
        tenant_id: TenantId,
        order_id: OrderId,
        gateway_code: GatewayCode,
        attempt_number: u32,
        amount_cents: i64,
        split: Option<CommissionSplit>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            tenant_id,
            order_id,
            gateway_code,
            attempt_number,
            external_reference: None,
            status: TransactionStatus::Initiated,
            amount_cents,
            payload: JsonValue::Null,
            split,
            created_at: now,
            updated_at: now,
        }
    }

    /// Gateway accepted the charge request.
    pub fn accept(
        &mut self,
        external_reference: String,
        payload: JsonValue,
        now: Timestamp,
    ) -> Result<bool, OrderError> {
        let changed = self.transition(TransactionStatus::Pending, now)?;
        if changed {
            self.external_reference = Some(external_reference);
            self.payload = payload;
        }
        Ok(changed)
    }

    /// Gateway refused the request or the processor reported a failure.
    pub fn fail(&mut self, detail: JsonValue, now: Timestamp) -> Result<bool, OrderError> {
        let changed = self.transition(TransactionStatus::Failed, now)?;
        if changed {
            self.payload = merge_detail(&self.payload, "failure", detail);
        }
        Ok(changed)
    }

    /// Records the processor reference if none is known yet.
    pub fn bind_reference(&mut self, external_reference: &str) {
        if self.external_reference.is_none() {
            self.external_reference = Some(external_reference.to_string());
        }
    }

    pub fn succeed(&mut self, now: Timestamp) -> Result<bool, OrderError> {
        self.transition(TransactionStatus::Succeeded, now)
    }

    fn transition(&mut self, to: TransactionStatus, now: Timestamp) -> Result<bool, OrderError> {
        if self.status == to {
            return Ok(false);
        }
        self.status = self.status.transition_to(to).map_err(|_| {
            OrderError::Validation(crate::domain::foundation::ValidationError::invalid_format(
                "transaction.status",
                format!("cannot move transaction from {} to {}", self.status, to),
            ))
        })?;
        self.updated_at = now;
        Ok(true)
    }
}

/// Books a gateway acceptance: the attempt becomes pending and the order
/// moves to processing.
///
/// If a confirmation already moved the attempt past `initiated`, only the
/// reference is filled in and `Ok(false)` is returned.
pub fn record_acceptance(
    order: &mut Order,
    transaction: &mut Transaction,
    external_reference: String,
    payload: JsonValue,
    now: Timestamp,
) -> Result<bool, OrderError> {
    if transaction.status != TransactionStatus::Initiated {
        transaction.bind_reference(&external_reference);
        return Ok(false);
    }
    transaction.accept(external_reference, payload, now)?;
    if order.status == OrderStatus::Pending {
        order.transition(OrderStatus::Processing, now)?;
    }
    Ok(true)
}

fn merge_detail(existing: &JsonValue, key: &str, detail: JsonValue) -> JsonValue {
    match existing {
        JsonValue::Object(map) => {
            let mut map = map.clone();
            map.insert(key.to_string(), detail);
            JsonValue::Object(map)
        }
        _ => serde_json::json!({ key: detail }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt() -> Transaction {
        Transaction::initiate(
            TenantId::new(),
            OrderId::new(),
            GatewayCode::new("stripe").unwrap(),
            1,
            5_500,
            None,
            Timestamp::now(),
        )
    }

    #[test]
    fn accept_records_reference_and_payload() {
        let mut tx = attempt();
        assert!(tx
            .accept("cs_123".to_string(), json!({"checkout_url": "https://pay"}), Timestamp::now())
            .unwrap());
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.external_reference.as_deref(), Some("cs_123"));
    }

    #[test]
    fn fail_keeps_accepted_payload() {
        let mut tx = attempt();
        tx.accept("cs_1".to_string(), json!({"payment_type": "checkout_url"}), Timestamp::now())
            .unwrap();
        tx.fail(json!({"reason": "card_declined"}), Timestamp::now()).unwrap();

        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.payload["payment_type"], "checkout_url");
        assert_eq!(tx.payload["failure"]["reason"], "card_declined");
    }

    #[test]
    fn failed_attempt_cannot_be_reaccepted() {
        let mut tx = attempt();
        tx.fail(json!({"reason": "timeout"}), Timestamp::now()).unwrap();
        assert!(tx
            .accept("late".to_string(), json!({}), Timestamp::now())
            .is_err());
        assert!(!tx.fail(json!({}), Timestamp::now()).unwrap());
    }

    #[test]
    fn acceptance_moves_order_to_processing_once() {
        use crate::domain::order::test_support::*;
        use crate::domain::order::OrderType;

        let tenant = TenantId::new();
        let course = product(tenant, 2_000);
        let mut order = Order::create(
            new_order(tenant, OrderType::OneTime, vec![line(&course, 1)]),
            &[course],
            Timestamp::now(),
        )
        .unwrap();
        let mut tx = attempt();

        assert!(record_acceptance(&mut order, &mut tx, "cs_9".into(), json!({}), Timestamp::now()).unwrap());
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(tx.status, TransactionStatus::Pending);

        assert!(!record_acceptance(&mut order, &mut tx, "cs_9".into(), json!({}), Timestamp::now()).unwrap());
    }

    #[test]
    fn acceptance_after_early_confirmation_keeps_success() {
        use crate::domain::order::test_support::*;
        use crate::domain::order::OrderType;

        let tenant = TenantId::new();
        let course = product(tenant, 2_000);
        let mut order = Order::create(
            new_order(tenant, OrderType::OneTime, vec![line(&course, 1)]),
            &[course],
            Timestamp::now(),
        )
        .unwrap();
        let mut tx = attempt();
        tx.succeed(Timestamp::now()).unwrap();

        assert!(!record_acceptance(&mut order, &mut tx, "cs_9".into(), json!({}), Timestamp::now()).unwrap());
        assert_eq!(tx.status, TransactionStatus::Succeeded);
        assert_eq!(tx.external_reference.as_deref(), Some("cs_9"));
    }

    #[test]
    fn succeeded_attempt_is_final() {
        let mut tx = attempt();
        tx.succeed(Timestamp::now()).unwrap();
        assert!(tx.fail(json!({}), Timestamp::now()).is_err());
    }
}
