//! Read-only view of the catalog service.

use async_trait::async_trait;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId, TenantId};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Current prices for `ids`. Unknown ids are omitted, not errors.
    async fn find_products(
        &self,
        tenant_id: TenantId,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, DomainError>;

    async fn find_product(&self, tenant_id: TenantId, id: ProductId) -> Result<Option<Product>, DomainError>;
}
