//! Order repository port.
//!
//! The only writer of order monetary state. Totals are set on `create`
//! and no method can change them afterwards.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, TenantId, Timestamp};
use crate::domain::order::{Order, OrderStatus};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the order and its items atomically.
    async fn create(&self, order: &Order) -> Result<(), DomainError>;

    async fn find_by_id(&self, tenant_id: TenantId, id: OrderId) -> Result<Option<Order>, DomainError>;

    /// Locks the order row and applies one status edge.
    ///
    /// Returns the order and whether anything changed.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order does not exist for this tenant
    /// - `IllegalOrderTransition` for edges outside the order state machine
    async fn transition(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        to: OrderStatus,
        now: Timestamp,
    ) -> Result<(Order, bool), DomainError>;
}
