//! Plan changes and proration quotes.
//!
//! The local ledger is authoritative for proration. The returned delta is
//! what the buyer owes for the rest of the period; collecting it is the
//! caller's decision.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::catalog::{BillingCycle, Product};
use crate::domain::foundation::{
    DomainError, ErrorCode, ProductId, SubscriptionId, TenantId, Timestamp,
};
use crate::domain::subscription::{ProductSubscription, Proration, SubscriptionError};
use crate::ports::{ProductCatalog, SubscriptionChange, SubscriptionRepository};

use super::SubscriptionActor;

#[derive(Debug, Clone)]
pub struct ChangePlanCommand {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub actor: SubscriptionActor,
    pub plan_id: ProductId,
    /// Defaults to the subscription's current cycle.
    pub cycle: Option<BillingCycle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePlanResult {
    pub subscription: ProductSubscription,
    pub proration: Proration,
}

pub struct ChangePlanHandler {
    catalog: Arc<dyn ProductCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl ChangePlanHandler {
    pub fn new(catalog: Arc<dyn ProductCatalog>, subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            catalog,
            subscriptions,
        }
    }

    pub async fn handle(&self, cmd: ChangePlanCommand) -> Result<ChangePlanResult, DomainError> {
        let plan = find_plan(self.catalog.as_ref(), cmd.tenant_id, cmd.plan_id).await?;
        let now = Timestamp::now();
        let requested = cmd.cycle;
        let actor = cmd.actor;

        let (subscription, change) = self
            .subscriptions
            .modify(
                cmd.tenant_id,
                cmd.subscription_id,
                Box::new(move |sub| {
                    actor.ensure_can_act_on(sub)?;
                    let cycle = requested.unwrap_or(sub.billing_cycle);
                    let amount = plan_price(&plan, cycle)?;
                    if sub.currency != plan.currency {
                        return Err(SubscriptionError::PlanNotEligible(
                            "plan is priced in another currency".to_string(),
                        ));
                    }
                    let proration = sub.change_plan(plan.id, cycle, amount, now)?;
                    Ok(SubscriptionChange::Repriced(proration))
                }),
            )
            .await?;

        let SubscriptionChange::Repriced(proration) = change else {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "plan change did not produce a proration",
            ));
        };

        tracing::info!(
            tenant_id = %subscription.tenant_id,
            subscription_id = %subscription.id,
            plan_id = %subscription.product_id,
            prorated_delta_cents = proration.prorated_delta_cents,
            "Subscription plan changed"
        );
        Ok(ChangePlanResult {
            subscription,
            proration,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CalculateProrationQuery {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub actor: SubscriptionActor,
    pub plan_id: ProductId,
    pub cycle: Option<BillingCycle>,
}

/// Read-only quote for a plan change.
pub struct CalculateProrationHandler {
    catalog: Arc<dyn ProductCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl CalculateProrationHandler {
    pub fn new(catalog: Arc<dyn ProductCatalog>, subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            catalog,
            subscriptions,
        }
    }

    pub async fn handle(&self, query: CalculateProrationQuery) -> Result<Proration, DomainError> {
        let subscription = self
            .subscriptions
            .find_by_id(query.tenant_id, query.subscription_id)
            .await?
            .ok_or(SubscriptionError::NotFound(query.subscription_id))?;
        query.actor.ensure_can_act_on(&subscription)?;
        let plan = find_plan(self.catalog.as_ref(), query.tenant_id, query.plan_id).await?;
        let amount = plan_price(&plan, query.cycle.unwrap_or(subscription.billing_cycle))?;
        Ok(subscription.calculate_proration(amount, Timestamp::now()))
    }
}

async fn find_plan(
    catalog: &dyn ProductCatalog,
    tenant_id: TenantId,
    plan_id: ProductId,
) -> Result<Product, DomainError> {
    catalog
        .find_product(tenant_id, plan_id)
        .await?
        .ok_or_else(|| {
            DomainError::new(ErrorCode::ProductNotFound, format!("Product not found: {}", plan_id))
        })
}

fn plan_price(plan: &Product, cycle: BillingCycle) -> Result<i64, SubscriptionError> {
    if !plan.active {
        return Err(SubscriptionError::PlanNotEligible(format!(
            "product {} is not for sale",
            plan.id
        )));
    }
    plan.recurring_price(cycle).ok_or_else(|| {
        SubscriptionError::PlanNotEligible(format!("product {} has no recurring terms", plan.id))
    })
}
