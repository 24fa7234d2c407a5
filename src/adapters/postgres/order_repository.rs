//! PostgreSQL implementation of OrderRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{db_error, encode_json, lock_order, update_order, OrderRow, ORDER_COLUMNS};
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, TenantId, Timestamp};
use crate::domain::order::{Order, OrderStatus};
use crate::ports::OrderRepository;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, order_number, buyer_id, status, order_type,
                total_amount_cents, currency, gateway_code, billing, items,
                subscription_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.tenant_id.as_uuid())
        .bind(&order.order_number)
        .bind(order.buyer_id.as_str())
        .bind(order.status.as_str())
        .bind(order.order_type.as_str())
        .bind(order.total_amount_cents)
        .bind(order.currency.as_str())
        .bind(order.gateway_code.as_ref().map(|c| c.as_str()))
        .bind(encode_json("orders.billing", &order.billing)?)
        .bind(encode_json("orders.items", &order.items)?)
        .bind(order.subscription_id.map(|id| *id.as_uuid()))
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("orders_tenant_number_key") {
                    return DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Order number {} already exists", order.order_number),
                    );
                }
            }
            db_error("Failed to insert order", e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1 AND tenant_id = $2",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn transition(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        to: OrderStatus,
        now: Timestamp,
    ) -> Result<(Order, bool), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let mut order = lock_order(&mut tx, tenant_id, id).await?;
        let changed = order.transition(to, now)?;
        if changed {
            update_order(&mut tx, &order).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok((order, changed))
    }
}
