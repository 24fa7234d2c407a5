//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{db_error, save_subscription, SubscriptionRow, SUBSCRIPTION_COLUMNS};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, TenantId, Timestamp};
use crate::domain::subscription::{ProductSubscription, SubscriptionStatus};
use crate::ports::{SubscriptionChange, SubscriptionMutation, SubscriptionRepository};

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
    ) -> Result<Option<ProductSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1 AND tenant_id = $2",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch subscription", e))?;

        row.map(ProductSubscription::try_from).transpose()
    }

    async fn create(&self, subscription: &ProductSubscription) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;
        save_subscription(&mut conn, subscription).await
    }

    async fn modify(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
        mutate: SubscriptionMutation,
    ) -> Result<(ProductSubscription, SubscriptionChange), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock subscription", e))?;

        let mut subscription = row
            .map(ProductSubscription::try_from)
            .transpose()?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", id),
                )
            })?;

        let change = mutate(&mut subscription)?;
        if change != SubscriptionChange::Unchanged {
            save_subscription(&mut tx, &subscription).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok((subscription, change))
    }

    async fn find_sweep_candidates(&self, now: Timestamp) -> Result<Vec<ProductSubscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions \
             WHERE (status = $1 AND current_period_end <= $2) OR status = $3",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(SubscriptionStatus::CancelPending.as_str())
        .bind(now.as_datetime())
        .bind(SubscriptionStatus::PastDue.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list sweep candidates", e))?;

        rows.into_iter().map(ProductSubscription::try_from).collect()
    }
}
