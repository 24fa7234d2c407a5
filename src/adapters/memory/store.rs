//! In-memory implementation of every persistence port.
//!
//! One `tokio::sync::Mutex` serializes all units of work, which stands in for
//! row locks. Each operation mutates clones and writes them back only after
//! every step succeeded, so a failed step leaves nothing behind.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::domain::catalog::Product;
use crate::domain::foundation::{
    DomainError, ErrorCode, GatewayCode, OrderId, ProductId, SubscriptionId, TenantId, Timestamp,
    TransactionId,
};
use crate::domain::gateway::{apply_default, GatewaySetting};
use crate::domain::order::{record_acceptance, Order, OrderStatus, Transaction, TransactionStatus};
use crate::domain::reconciliation::{PaymentRecord, ReconcileOutcome};
use crate::domain::subscription::{ProductSubscription, SubscriptionStatus};
use crate::ports::{
    GatewaySettingRepository, OrderRepository, PaymentLedger, ProductCatalog, ReconcileFn,
    SubscriptionChange, SubscriptionMutation, SubscriptionRepository,
};

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderId, Order>,
    transactions: HashMap<TransactionId, Transaction>,
    subscriptions: HashMap<SubscriptionId, ProductSubscription>,
    settings: Vec<GatewaySetting>,
    products: HashMap<ProductId, Product>,
}

impl StoreState {
    fn order(&self, tenant_id: TenantId, id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .get(&id)
            .filter(|order| order.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| order_not_found(id))
    }

    fn transaction(&self, tenant_id: TenantId, id: TransactionId) -> Result<Transaction, DomainError> {
        self.transactions
            .get(&id)
            .filter(|tx| tx.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::new(ErrorCode::TransactionNotFound, format!("Transaction not found: {}", id))
            })
    }

    fn attempts(&self, order_id: OrderId) -> Vec<&Transaction> {
        let mut attempts: Vec<&Transaction> = self
            .transactions
            .values()
            .filter(|tx| tx.order_id == order_id)
            .collect();
        attempts.sort_by_key(|tx| tx.attempt_number);
        attempts
    }
}

fn order_not_found(id: OrderId) -> DomainError {
    DomainError::new(ErrorCode::OrderNotFound, format!("Order not found: {}", id))
}

/// Process-local store for tests and single-node demos.
#[derive(Default)]
pub struct InMemoryCommerceStore {
    state: Mutex<StoreState>,
}

impl InMemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the catalog view.
    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.state.lock().await.transactions.get(&id).cloned()
    }

    pub async fn subscriptions_for_order(&self, order_id: OrderId) -> Vec<ProductSubscription> {
        self.state
            .lock()
            .await
            .subscriptions
            .values()
            .filter(|sub| sub.order_id == Some(order_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryCommerceStore {
    async fn create(&self, order: &Order) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.orders.contains_key(&order.id) {
            return Err(DomainError::database(format!("Order {} already exists", order.id)));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: OrderId) -> Result<Option<Order>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .get(&id)
            .filter(|order| order.tenant_id == tenant_id)
            .cloned())
    }

    async fn transition(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        to: OrderStatus,
        now: Timestamp,
    ) -> Result<(Order, bool), DomainError> {
        let mut state = self.state.lock().await;
        let mut order = state.order(tenant_id, id)?;
        let changed = order.transition(to, now)?;
        if changed {
            state.orders.insert(id, order.clone());
        }
        Ok((order, changed))
    }
}

#[async_trait]
impl PaymentLedger for InMemoryCommerceStore {
    async fn begin_attempt(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.order(transaction.tenant_id, transaction.order_id)?;
        let taken = state
            .attempts(transaction.order_id)
            .iter()
            .any(|tx| tx.attempt_number == transaction.attempt_number);
        if taken {
            return Err(DomainError::new(
                ErrorCode::PaymentInFlight,
                "Another payment attempt for this order was started concurrently",
            ));
        }
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn list_for_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Vec<Transaction>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .attempts(order_id)
            .into_iter()
            .filter(|tx| tx.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn record_accepted(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        external_reference: String,
        payload: JsonValue,
        now: Timestamp,
    ) -> Result<(Transaction, Order), DomainError> {
        let mut state = self.state.lock().await;
        let mut transaction = state.transaction(tenant_id, transaction_id)?;
        let mut order = state.order(tenant_id, transaction.order_id)?;

        record_acceptance(&mut order, &mut transaction, external_reference, payload, now)?;

        state.transactions.insert(transaction.id, transaction.clone());
        state.orders.insert(order.id, order.clone());
        Ok((transaction, order))
    }

    async fn record_rejected(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        detail: JsonValue,
        now: Timestamp,
    ) -> Result<Transaction, DomainError> {
        let mut state = self.state.lock().await;
        let mut transaction = state.transaction(tenant_id, transaction_id)?;
        transaction.fail(detail, now)?;
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn reconcile(
        &self,
        tenant_id: TenantId,
        gateway_code: &GatewayCode,
        external_reference: &str,
        transaction_id: Option<TransactionId>,
        decide: ReconcileFn,
    ) -> Result<Option<(ReconcileOutcome, PaymentRecord)>, DomainError> {
        let mut state = self.state.lock().await;
        let owned = |tx: &&Transaction| tx.tenant_id == tenant_id && &tx.gateway_code == gateway_code;
        let by_reference = state
            .transactions
            .values()
            .filter(owned)
            .find(|tx| tx.external_reference.as_deref() == Some(external_reference));
        let by_id = || {
            transaction_id
                .and_then(|id| state.transactions.get(&id))
                .filter(owned)
                .filter(|tx| tx.external_reference.is_none())
        };
        let Some(mut transaction) = by_reference.or_else(by_id).cloned() else {
            return Ok(None);
        };
        transaction.bind_reference(external_reference);

        let order = state.order(tenant_id, transaction.order_id)?;
        let attempts = state.attempts(order.id);
        let attempt_count = attempts.len() as u32;
        let succeeded_sibling = attempts
            .iter()
            .find(|tx| tx.status == TransactionStatus::Succeeded && tx.id != transaction.id)
            .map(|tx| tx.id);
        let subscription = order
            .subscription_id
            .and_then(|id| state.subscriptions.get(&id))
            .filter(|sub| sub.tenant_id == tenant_id)
            .cloned();

        let mut record = PaymentRecord {
            transaction,
            order,
            attempt_count,
            succeeded_sibling,
            subscription,
        };
        let outcome = decide(&mut record);

        if outcome.is_applied() {
            state
                .transactions
                .insert(record.transaction.id, record.transaction.clone());
            state.orders.insert(record.order.id, record.order.clone());
            if let Some(subscription) = &record.subscription {
                state.subscriptions.insert(subscription.id, subscription.clone());
            }
        }
        Ok(Some((outcome, record)))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryCommerceStore {
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
    ) -> Result<Option<ProductSubscription>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .get(&id)
            .filter(|sub| sub.tenant_id == tenant_id)
            .cloned())
    }

    async fn create(&self, subscription: &ProductSubscription) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::database(format!(
                "Subscription {} already exists",
                subscription.id
            )));
        }
        state.subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn modify(
        &self,
        tenant_id: TenantId,
        id: SubscriptionId,
        mutate: SubscriptionMutation,
    ) -> Result<(ProductSubscription, SubscriptionChange), DomainError> {
        let mut state = self.state.lock().await;
        let mut subscription = state
            .subscriptions
            .get(&id)
            .filter(|sub| sub.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, format!("Subscription not found: {}", id))
            })?;

        let change = mutate(&mut subscription)?;
        if change != SubscriptionChange::Unchanged {
            state.subscriptions.insert(id, subscription.clone());
        }
        Ok((subscription, change))
    }

    async fn find_sweep_candidates(&self, now: Timestamp) -> Result<Vec<ProductSubscription>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|sub| match sub.status {
                SubscriptionStatus::CancelPending => sub.current_period_end <= now,
                SubscriptionStatus::PastDue => true,
                _ => false,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GatewaySettingRepository for InMemoryCommerceStore {
    async fn find(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
    ) -> Result<Option<GatewaySetting>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .settings
            .iter()
            .find(|s| s.tenant_id == tenant_id && &s.code == code)
            .cloned())
    }

    async fn find_default(&self, tenant_id: TenantId) -> Result<Option<GatewaySetting>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .settings
            .iter()
            .find(|s| s.tenant_id == tenant_id && s.is_default)
            .cloned())
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<GatewaySetting>, DomainError> {
        let state = self.state.lock().await;
        let mut settings: Vec<GatewaySetting> = state
            .settings
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        settings.sort_by(|a, b| a.code.as_str().cmp(b.code.as_str()));
        Ok(settings)
    }

    async fn upsert(&self, setting: &GatewaySetting) -> Result<GatewaySetting, DomainError> {
        let mut state = self.state.lock().await;
        let existing = state
            .settings
            .iter_mut()
            .find(|s| s.tenant_id == setting.tenant_id && s.code == setting.code);

        let stored = match existing {
            Some(current) => {
                let mut next = setting.clone();
                next.id = current.id;
                next.is_default = current.is_default && next.enabled;
                next.created_at = current.created_at;
                *current = next.clone();
                next
            }
            None => {
                let mut next = setting.clone();
                next.is_default = false;
                state.settings.push(next.clone());
                next
            }
        };
        Ok(stored)
    }

    async fn set_default(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
        now: Timestamp,
    ) -> Result<GatewaySetting, DomainError> {
        let mut state = self.state.lock().await;
        let mut tenant_settings: Vec<GatewaySetting> = state
            .settings
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();

        if !apply_default(&mut tenant_settings, code, now) {
            return Err(DomainError::new(
                ErrorCode::GatewayNotConfigured,
                format!("Gateway '{}' is not configured or is disabled", code),
            ));
        }

        let mut chosen = None;
        for updated in tenant_settings {
            if updated.is_default {
                chosen = Some(updated.clone());
            }
            if let Some(slot) = state.settings.iter_mut().find(|s| s.id == updated.id) {
                *slot = updated;
            }
        }
        chosen.ok_or_else(|| DomainError::new(ErrorCode::InternalError, "default was not applied"))
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCommerceStore {
    async fn find_products(
        &self,
        tenant_id: TenantId,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, DomainError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .filter(|product| product.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_product(&self, tenant_id: TenantId, id: ProductId) -> Result<Option<Product>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .get(&id)
            .filter(|product| product.tenant_id == tenant_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::test_support::setting;
    use crate::domain::gateway::GatewayKind;
    use crate::domain::order::test_support::*;
    use crate::domain::order::OrderType;
    use crate::domain::reconciliation::{reconcile, GatewayEvent, ReconcilePolicy};
    use crate::domain::subscription::test_support::active_for_30_days;
    use serde_json::json;
    use std::sync::Arc;

    async fn seeded_order(store: &InMemoryCommerceStore) -> Order {
        let tenant = TenantId::new();
        let course = product(tenant, 2_000);
        store.insert_product(course.clone()).await;
        let order = Order::create(
            new_order(tenant, OrderType::OneTime, vec![line(&course, 2)]),
            &[course],
            Timestamp::now(),
        )
        .unwrap();
        OrderRepository::create(store, &order).await.unwrap();
        order
    }

    fn attempt(order: &Order, number: u32) -> Transaction {
        Transaction::initiate(
            order.tenant_id,
            order.id,
            GatewayCode::new("mock").unwrap(),
            number,
            order.total_amount_cents,
            None,
            Timestamp::now(),
        )
    }

    // ════════════════════════════════════════════════════════════════════
    // Orders and attempts
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn orders_are_invisible_to_other_tenants() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;

        assert!(OrderRepository::find_by_id(&store, TenantId::new(), order.id)
            .await
            .unwrap()
            .is_none());
        let err = OrderRepository::transition(
            &store,
            TenantId::new(),
            order.id,
            OrderStatus::Processing,
            Timestamp::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn illegal_order_transition_is_not_persisted() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;

        let err = OrderRepository::transition(&store, order.tenant_id, order.id, OrderStatus::Completed, Timestamp::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::IllegalOrderTransition);
        let stored = OrderRepository::find_by_id(&store, order.tenant_id, order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_attempt_number_is_refused() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;

        store.begin_attempt(&attempt(&order, 1)).await.unwrap();
        let err = store.begin_attempt(&attempt(&order, 1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentInFlight);
    }

    #[tokio::test]
    async fn acceptance_updates_attempt_and_order_together() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;
        let tx = attempt(&order, 1);
        store.begin_attempt(&tx).await.unwrap();

        let (tx, order) = store
            .record_accepted(order.tenant_id, tx.id, "ref_1".into(), json!({}), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(order.status, OrderStatus::Processing);
    }

    // ════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn reconcile_with_unknown_reference_returns_none() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;

        let result = store
            .reconcile(
                order.tenant_id,
                &GatewayCode::new("mock").unwrap(),
                "nope",
                None,
                Box::new(|_| ReconcileOutcome::AlreadyApplied),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn rejected_outcome_persists_nothing() {
        let store = InMemoryCommerceStore::new();
        let order = seeded_order(&store).await;
        let tx = attempt(&order, 1);
        store.begin_attempt(&tx).await.unwrap();
        store
            .record_accepted(order.tenant_id, tx.id, "ref_1".into(), json!({}), Timestamp::now())
            .await
            .unwrap();

        let event = GatewayEvent::succeeded("ref_1").with_amount(1);
        let (outcome, _) = store
            .reconcile(
                order.tenant_id,
                &GatewayCode::new("mock").unwrap(),
                "ref_1",
                None,
                Box::new(move |record| {
                    reconcile(record, &event, &ReconcilePolicy::default(), Timestamp::now())
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Rejected { .. }));
        assert_eq!(store.transaction(tx.id).await.unwrap().status, TransactionStatus::Pending);
    }

    // ════════════════════════════════════════════════════════════════════
    // Subscriptions and settings
    // ════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unchanged_modification_is_not_written() {
        let store = InMemoryCommerceStore::new();
        let sub = active_for_30_days(Timestamp::now());
        SubscriptionRepository::create(&store, &sub).await.unwrap();

        let (after, change) = store
            .modify(
                sub.tenant_id,
                sub.id,
                Box::new(|sub| {
                    sub.status = SubscriptionStatus::Paused;
                    Ok(SubscriptionChange::Unchanged)
                }),
            )
            .await
            .unwrap();

        assert_eq!(change, SubscriptionChange::Unchanged);
        assert_eq!(after.status, SubscriptionStatus::Paused);
        let stored = SubscriptionRepository::find_by_id(&store, sub.tenant_id, sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn concurrent_set_default_leaves_exactly_one_default() {
        let store = Arc::new(InMemoryCommerceStore::new());
        let tenant = TenantId::new();
        let codes = ["alpha", "bravo", "charlie", "delta"];
        for code in codes {
            store.upsert(&setting(tenant, code, GatewayKind::PaymentLink)).await.unwrap();
        }

        let mut handles = Vec::new();
        for round in 0..20 {
            let store = store.clone();
            let code = GatewayCode::new(codes[round % codes.len()]).unwrap();
            handles.push(tokio::spawn(async move {
                store.set_default(tenant, &code, Timestamp::now()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let defaults = store
            .list(tenant)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.is_default)
            .count();
        assert_eq!(defaults, 1);
    }

    #[tokio::test]
    async fn set_default_on_disabled_gateway_fails_and_keeps_previous() {
        let store = InMemoryCommerceStore::new();
        let tenant = TenantId::new();
        store.upsert(&setting(tenant, "alpha", GatewayKind::CardRail)).await.unwrap();
        let mut off = setting(tenant, "bravo", GatewayKind::CardRail);
        off.enabled = false;
        store.upsert(&off).await.unwrap();
        store
            .set_default(tenant, &GatewayCode::new("alpha").unwrap(), Timestamp::now())
            .await
            .unwrap();

        let err = store
            .set_default(tenant, &GatewayCode::new("bravo").unwrap(), Timestamp::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::GatewayNotConfigured);
        let default = store.find_default(tenant).await.unwrap().unwrap();
        assert_eq!(default.code.as_str(), "alpha");
    }
}
