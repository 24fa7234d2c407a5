//! StartTrialHandler - opens a free trial for a plan that offers one.

use std::sync::Arc;

use crate::domain::catalog::BillingCycle;
use crate::domain::foundation::{BuyerId, DomainError, ErrorCode, ProductId, TenantId, Timestamp};
use crate::domain::subscription::{NewSubscription, ProductSubscription, SubscriptionError};
use crate::ports::{ProductCatalog, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    /// Cycle billed once the trial converts; defaults to monthly.
    pub cycle: Option<BillingCycle>,
}

/// The trial converts through a renewal order that pays the first period.
pub struct StartTrialHandler {
    catalog: Arc<dyn ProductCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl StartTrialHandler {
    pub fn new(catalog: Arc<dyn ProductCatalog>, subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            catalog,
            subscriptions,
        }
    }

    pub async fn handle(&self, cmd: StartTrialCommand) -> Result<ProductSubscription, DomainError> {
        let product = self
            .catalog
            .find_product(cmd.tenant_id, cmd.product_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ProductNotFound,
                    format!("Product not found: {}", cmd.product_id),
                )
            })?;

        let cycle = cmd.cycle.unwrap_or_default();
        let amount_cents = product
            .recurring_price(cycle)
            .filter(|_| product.active)
            .ok_or_else(|| {
                SubscriptionError::PlanNotEligible(format!("product {} is not a plan for sale", product.id))
            })?;
        let trial_days = product.trial_days();
        if trial_days == 0 {
            return Err(SubscriptionError::PlanNotEligible(format!(
                "product {} does not offer a trial",
                product.id
            ))
            .into());
        }

        let now = Timestamp::now();
        let subscription = ProductSubscription::start_trial(
            NewSubscription {
                tenant_id: cmd.tenant_id,
                buyer_id: cmd.buyer_id,
                product_id: product.id,
                order_id: None,
                billing_cycle: cycle,
                amount_cents,
                currency: product.currency.clone(),
            },
            trial_days,
            now,
        );
        self.subscriptions.create(&subscription).await?;

        tracing::info!(
            tenant_id = %subscription.tenant_id,
            subscription_id = %subscription.id,
            trial_days,
            "Trial started"
        );

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::SubscriptionStatus;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::catalog::RecurringTerms;

    fn command(h: &Harness, product_id: ProductId) -> StartTrialCommand {
        StartTrialCommand {
            tenant_id: h.tenant,
            buyer_id: BuyerId::new("buyer-1").unwrap(),
            product_id,
            cycle: None,
        }
    }

    fn handler(h: &Harness) -> StartTrialHandler {
        StartTrialHandler::new(h.store.clone(), h.store.clone())
    }

    #[tokio::test]
    async fn trial_plan_starts_in_trial() {
        let h = Harness::new().await;
        let mut trial_plan = h.plan.clone();
        trial_plan.id = ProductId::new();
        trial_plan.recurring = Some(RecurringTerms {
            monthly_price_cents: 3_000,
            yearly_price_cents: 30_000,
            trial_days: 14,
        });
        h.store.insert_product(trial_plan.clone()).await;

        let sub = handler(&h).handle(command(&h, trial_plan.id)).await.unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Trial);
        assert_eq!(sub.trial_ends_at, Some(sub.current_period_end));
        assert_eq!(sub.current_period_end.days_since(&sub.current_period_start), 14);
        assert_eq!(sub.amount_cents, 3_000);
        assert!(sub.order_id.is_none());
    }

    #[tokio::test]
    async fn plan_without_trial_is_not_eligible() {
        let h = Harness::new().await;
        let err = handler(&h).handle(command(&h, h.plan.id)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotEligible);
    }

    #[tokio::test]
    async fn one_time_product_is_not_eligible() {
        let h = Harness::new().await;
        let err = handler(&h).handle(command(&h, h.course.id)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotEligible);
    }
}
