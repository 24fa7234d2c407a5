//! CreateOrderHandler - prices a checkout request and persists the order.

use std::sync::Arc;

use crate::domain::foundation::{
    BuyerId, DomainError, ErrorCode, GatewayCode, ProductId, SubscriptionId, TenantId, Timestamp,
};
use crate::domain::order::{BillingSnapshot, LineRequest, NewOrder, Order, OrderType};
use crate::domain::subscription::SubscriptionStatus;
use crate::ports::{OrderRepository, ProductCatalog, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
    pub order_type: OrderType,
    pub lines: Vec<LineRequest>,
    pub billing: BillingSnapshot,
    pub gateway_code: Option<GatewayCode>,
    /// Subscription whose next period this order pays.
    pub renews: Option<SubscriptionId>,
}

/// Prices lines from the catalog's current view; client totals are never read.
pub struct CreateOrderHandler {
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl CreateOrderHandler {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        orders: Arc<dyn OrderRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            catalog,
            orders,
            subscriptions,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<Order, DomainError> {
        if let Some(subscription_id) = cmd.renews {
            self.check_renewable(&cmd, subscription_id).await?;
        }

        let mut product_ids: Vec<ProductId> = cmd.lines.iter().map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let products = self.catalog.find_products(cmd.tenant_id, &product_ids).await?;

        let order = Order::create(
            NewOrder {
                tenant_id: cmd.tenant_id,
                buyer_id: cmd.buyer_id,
                order_type: cmd.order_type,
                lines: cmd.lines,
                billing: cmd.billing,
                gateway_code: cmd.gateway_code,
                renews: cmd.renews,
            },
            &products,
            Timestamp::now(),
        )?;
        self.orders.create(&order).await?;

        tracing::info!(
            tenant_id = %order.tenant_id,
            order_id = %order.id,
            order_number = %order.order_number,
            total_amount_cents = order.total_amount_cents,
            "Order created"
        );
        Ok(order)
    }

    /// A renewal must target a live subscription of the same buyer and plan.
    async fn check_renewable(
        &self,
        cmd: &CreateOrderCommand,
        subscription_id: SubscriptionId,
    ) -> Result<(), DomainError> {
        let subscription = self
            .subscriptions
            .find_by_id(cmd.tenant_id, subscription_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", subscription_id),
                )
            })?;

        if subscription.buyer_id != cmd.buyer_id {
            return Err(DomainError::validation(
                "renews",
                "subscription belongs to another buyer",
            ));
        }
        if !matches!(
            subscription.status,
            SubscriptionStatus::Trial | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        ) {
            return Err(DomainError::new(
                ErrorCode::IllegalSubscriptionTransition,
                format!("Cannot renew a {} subscription", subscription.status),
            ));
        }
        if !cmd.lines.iter().any(|l| l.product_id == subscription.product_id) {
            return Err(DomainError::validation(
                "renews",
                "renewal must be for the subscribed plan",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::catalog::BillingCycle;
    use crate::domain::order::test_support::{billing, line, product};
    use crate::domain::order::OrderStatus;
    use crate::domain::subscription::test_support::new_subscription;
    use crate::domain::subscription::ProductSubscription;

    fn handler(h: &Harness) -> CreateOrderHandler {
        CreateOrderHandler::new(h.store.clone(), h.store.clone(), h.store.clone())
    }

    fn command(h: &Harness, order_type: OrderType, lines: Vec<LineRequest>) -> CreateOrderCommand {
        CreateOrderCommand {
            tenant_id: h.tenant,
            buyer_id: BuyerId::new("buyer-1").unwrap(),
            order_type,
            lines,
            billing: billing(),
            gateway_code: None,
            renews: None,
        }
    }

    async fn subscription_for(h: &Harness, status: SubscriptionStatus) -> ProductSubscription {
        let mut new = new_subscription(h.tenant);
        new.product_id = h.plan.id;
        let mut sub = ProductSubscription::activate_new(new, Timestamp::now());
        sub.status = status;
        SubscriptionRepository::create(h.store.as_ref(), &sub).await.unwrap();
        sub
    }

    #[tokio::test]
    async fn prices_lines_from_catalog() {
        let h = Harness::new().await;
        let order = handler(&h)
            .handle(command(&h, OrderType::OneTime, vec![line(&h.course, 2), line(&h.course, 1)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount_cents, 3 * 2_750);
        let stored = OrderRepository::find_by_id(h.store.as_ref(), h.tenant, order.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(order));
    }

    #[tokio::test]
    async fn product_of_another_tenant_is_a_validation_error() {
        let h = Harness::new().await;
        let foreign = product(TenantId::new(), 100);
        h.store.insert_product(foreign.clone()).await;

        let err = handler(&h)
            .handle(command(&h, OrderType::OneTime, vec![line(&foreign, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn one_time_product_in_subscription_order_is_not_eligible() {
        let h = Harness::new().await;
        let err = handler(&h)
            .handle(command(&h, OrderType::Subscription, vec![line(&h.course, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotEligible);
    }

    #[tokio::test]
    async fn yearly_plan_uses_yearly_price() {
        let h = Harness::new().await;
        let mut plan_line = line(&h.plan, 1);
        plan_line.cycle = Some(BillingCycle::Yearly);

        let order = handler(&h)
            .handle(command(&h, OrderType::Subscription, vec![plan_line]))
            .await
            .unwrap();
        assert_eq!(order.total_amount_cents, 30_000);
    }

    #[tokio::test]
    async fn renewal_links_live_subscription() {
        let h = Harness::new().await;
        let sub = subscription_for(&h, SubscriptionStatus::PastDue).await;
        let mut cmd = command(&h, OrderType::Subscription, vec![line(&h.plan, 1)]);
        cmd.renews = Some(sub.id);

        let order = handler(&h).handle(cmd).await.unwrap();
        assert_eq!(order.subscription_id, Some(sub.id));
    }

    #[tokio::test]
    async fn renewal_of_canceled_subscription_is_refused() {
        let h = Harness::new().await;
        let sub = subscription_for(&h, SubscriptionStatus::Canceled).await;
        let mut cmd = command(&h, OrderType::Subscription, vec![line(&h.plan, 1)]);
        cmd.renews = Some(sub.id);

        let err = handler(&h).handle(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::IllegalSubscriptionTransition);
    }

    #[tokio::test]
    async fn renewal_by_other_buyer_is_refused() {
        let h = Harness::new().await;
        let sub = subscription_for(&h, SubscriptionStatus::Active).await;
        let mut cmd = command(&h, OrderType::Subscription, vec![line(&h.plan, 1)]);
        cmd.buyer_id = BuyerId::new("someone-else").unwrap();
        cmd.renews = Some(sub.id);

        let err = handler(&h).handle(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
