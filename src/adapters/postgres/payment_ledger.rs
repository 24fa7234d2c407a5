//! PostgreSQL implementation of PaymentLedger.
//!
//! Every write locks the order row before any of its attempts. Holding the
//! order lock serializes attempt numbering, acceptance, and reconciliation
//! for one order without a global lock.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::rows::{
    db_error, encode_json, lock_order, save_subscription, update_order, update_transaction,
    SubscriptionRow, TransactionRow, SUBSCRIPTION_COLUMNS, TRANSACTION_COLUMNS,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, GatewayCode, OrderId, TenantId, Timestamp, TransactionId,
};
use crate::domain::order::{record_acceptance, Order, Transaction, TransactionStatus};
use crate::domain::reconciliation::{PaymentRecord, ReconcileOutcome};
use crate::domain::subscription::ProductSubscription;
use crate::ports::{PaymentLedger, ReconcileFn};

pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn attempts_for_order(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<Transaction>, DomainError> {
    let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM transactions WHERE order_id = $1 ORDER BY attempt_number",
        TRANSACTION_COLUMNS
    ))
    .bind(order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to list transactions", e))?;

    rows.into_iter().map(Transaction::try_from).collect()
}

async fn order_of_transaction(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    transaction_id: TransactionId,
) -> Result<OrderId, DomainError> {
    let order_id: Option<Uuid> =
        sqlx::query_scalar("SELECT order_id FROM transactions WHERE id = $1 AND tenant_id = $2")
            .bind(transaction_id.as_uuid())
            .bind(tenant_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch transaction", e))?;

    order_id.map(OrderId::from_uuid).ok_or_else(|| {
        DomainError::new(
            ErrorCode::TransactionNotFound,
            format!("Transaction not found: {}", transaction_id),
        )
    })
}

async fn lock_transaction(
    conn: &mut PgConnection,
    transaction_id: TransactionId,
) -> Result<Transaction, DomainError> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM transactions WHERE id = $1 FOR UPDATE",
        TRANSACTION_COLUMNS
    ))
    .bind(transaction_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to lock transaction", e))?;

    row.map(Transaction::try_from).transpose()?.ok_or_else(|| {
        DomainError::new(
            ErrorCode::TransactionNotFound,
            format!("Transaction not found: {}", transaction_id),
        )
    })
}

async fn lock_subscription(
    conn: &mut PgConnection,
    order: &Order,
) -> Result<Option<ProductSubscription>, DomainError> {
    let Some(subscription_id) = order.subscription_id else {
        return Ok(None);
    };
    let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
        "SELECT {} FROM subscriptions WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(subscription_id.as_uuid())
    .bind(order.tenant_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to lock subscription", e))?;

    row.map(ProductSubscription::try_from).transpose()
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn begin_attempt(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        lock_order(&mut tx, transaction.tenant_id, transaction.order_id).await?;

        let split = transaction
            .split
            .as_ref()
            .map(|split| encode_json("transactions.split", split))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, tenant_id, order_id, gateway_code, attempt_number, external_reference,
                status, amount_cents, payload, split, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.tenant_id.as_uuid())
        .bind(transaction.order_id.as_uuid())
        .bind(transaction.gateway_code.as_str())
        .bind(transaction.attempt_number as i32)
        .bind(&transaction.external_reference)
        .bind(transaction.status.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.payload)
        .bind(split)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("transactions_order_attempt_key") {
                    return DomainError::new(
                        ErrorCode::PaymentInFlight,
                        "Another payment attempt for this order was started concurrently",
                    );
                }
            }
            db_error("Failed to insert transaction", e)
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(())
    }

    async fn list_for_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE order_id = $1 AND tenant_id = $2 ORDER BY attempt_number",
            TRANSACTION_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list transactions", e))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn record_accepted(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        external_reference: String,
        payload: JsonValue,
        now: Timestamp,
    ) -> Result<(Transaction, Order), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let order_id = order_of_transaction(&mut tx, tenant_id, transaction_id).await?;
        let mut order = lock_order(&mut tx, tenant_id, order_id).await?;
        let mut transaction = lock_transaction(&mut tx, transaction_id).await?;

        record_acceptance(&mut order, &mut transaction, external_reference, payload, now)?;
        update_transaction(&mut tx, &transaction).await?;
        update_order(&mut tx, &order).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok((transaction, order))
    }

    async fn record_rejected(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        detail: JsonValue,
        now: Timestamp,
    ) -> Result<Transaction, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let order_id = order_of_transaction(&mut tx, tenant_id, transaction_id).await?;
        lock_order(&mut tx, tenant_id, order_id).await?;
        let mut transaction = lock_transaction(&mut tx, transaction_id).await?;

        if transaction.fail(detail, now)? {
            update_transaction(&mut tx, &transaction).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(transaction)
    }

    async fn reconcile(
        &self,
        tenant_id: TenantId,
        gateway_code: &GatewayCode,
        external_reference: &str,
        transaction_id: Option<TransactionId>,
        decide: ReconcileFn,
    ) -> Result<Option<(ReconcileOutcome, PaymentRecord)>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let located: Option<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT id, order_id FROM transactions
            WHERE tenant_id = $1 AND gateway_code = $2 AND external_reference = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(gateway_code.as_str())
        .bind(external_reference)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to find transaction by reference", e))?;

        let located: Option<(Uuid, Uuid)> = match (located, transaction_id) {
            (None, Some(id)) => sqlx::query_as(
                r#"
                SELECT id, order_id FROM transactions
                WHERE id = $1 AND tenant_id = $2 AND gateway_code = $3
                  AND external_reference IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .bind(gateway_code.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to find transaction by id", e))?,
            (located, _) => located,
        };

        let Some((transaction_id, order_id)) = located else {
            return Ok(None);
        };

        let order = lock_order(&mut tx, tenant_id, OrderId::from_uuid(order_id)).await?;
        let mut transaction = lock_transaction(&mut tx, TransactionId::from_uuid(transaction_id)).await?;
        transaction.bind_reference(external_reference);
        let attempts = attempts_for_order(&mut tx, order.id).await?;
        let subscription = lock_subscription(&mut tx, &order).await?;

        let succeeded_sibling = attempts
            .iter()
            .find(|a| a.status == TransactionStatus::Succeeded && a.id != transaction.id)
            .map(|a| a.id);

        let mut record = PaymentRecord {
            transaction,
            order,
            attempt_count: attempts.len() as u32,
            succeeded_sibling,
            subscription,
        };
        let outcome = decide(&mut record);

        if outcome.is_applied() {
            // A new subscription must exist before the order points at it.
            if let Some(subscription) = &record.subscription {
                save_subscription(&mut tx, subscription).await?;
            }
            update_transaction(&mut tx, &record.transaction).await?;
            update_order(&mut tx, &record.order).await?;
            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;
        } else {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back transaction", e))?;
        }

        Ok(Some((outcome, record)))
    }
}
