//! PostgreSQL implementation of ProductCatalog.
//!
//! Read-only view over the catalog table maintained by the product service.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::{db_error, product_from_row, PRODUCT_COLUMNS};
use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId, TenantId};
use crate::ports::ProductCatalog;

pub struct PostgresProductCatalog {
    pool: PgPool,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    async fn find_products(
        &self,
        tenant_id: TenantId,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, DomainError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE tenant_id = $1 AND id = ANY($2)",
            PRODUCT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_product(&self, tenant_id: TenantId, id: ProductId) -> Result<Option<Product>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE tenant_id = $1 AND id = $2",
            PRODUCT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }
}
