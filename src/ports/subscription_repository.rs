//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, TenantId, Timestamp};
use crate::domain::subscription::{
    ProductSubscription, Proration, SubscriptionError, SubscriptionStatus,
};

/// What a mutation did to the locked subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionChange {
    /// Already in the requested state; nothing is written.
    Unchanged,
    /// State changed; carries the status held before the mutation.
    Applied { from: SubscriptionStatus },
    /// Plan switched; carries the proration for the remainder.
    Repriced(Proration),
}

pub type SubscriptionMutation =
    Box<dyn FnOnce(&mut ProductSubscription) -> Result<SubscriptionChange, SubscriptionError> + Send>;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
    ) -> Result<Option<ProductSubscription>, DomainError>;

    async fn create(&self, subscription: &ProductSubscription) -> Result<(), DomainError>;

    /// Locks the subscription, applies `mutate`, and writes it back unless
    /// the change is `Unchanged` or `mutate` fails.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if absent for this tenant
    /// - whatever `mutate` returns, converted to `DomainError`
    async fn modify(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
        mutate: SubscriptionMutation,
    ) -> Result<(ProductSubscription, SubscriptionChange), DomainError>;

    /// Subscriptions the sweeper may need to close: `cancel_pending` past
    /// their period end and every `past_due`. Spans all tenants.
    async fn find_sweep_candidates(&self, now: Timestamp) -> Result<Vec<ProductSubscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SubscriptionRepository) {}
}
