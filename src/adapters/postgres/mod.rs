//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresOrderRepository` - Orders and their status edges
//! - `PostgresPaymentLedger` - Attempts, acceptance, and locked reconciliation
//! - `PostgresSubscriptionRepository` - Row-locked subscription mutation
//! - `PostgresGatewaySettingRepository` - Tenant gateway configuration
//! - `PostgresProductCatalog` - Read-only catalog view
//!
//! Schema lives in `migrations/`; `run_migrations` applies it.

mod gateway_setting_repository;
mod order_repository;
mod payment_ledger;
mod product_catalog;
mod rows;
mod subscription_repository;

pub use gateway_setting_repository::PostgresGatewaySettingRepository;
pub use order_repository::PostgresOrderRepository;
pub use payment_ledger::PostgresPaymentLedger;
pub use product_catalog::PostgresProductCatalog;
pub use subscription_repository::PostgresSubscriptionRepository;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e)))
}
