//! Shared fixtures for handler tests: in-memory store, event bus and a mock
//! gateway registered as the tenant default.

use std::sync::Arc;

use serde_json::json;

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::gateways::{MockGatewayAdapter, MockGatewayResolver};
use crate::adapters::memory::InMemoryCommerceStore;
use crate::domain::catalog::{BillingCycle, Product};
use crate::domain::foundation::{GatewayCode, TenantId, Timestamp, TransactionId};
use crate::domain::gateway::GatewayKind;
use crate::domain::order::test_support::{line, new_order, plan, product};
use crate::domain::order::{LineRequest, Order, OrderType};
use crate::domain::reconciliation::sign_body;
use crate::ports::OrderRepository;

pub const MOCK_SECRET: &str = "whsec_mock_secret";

pub struct Harness {
    pub tenant: TenantId,
    pub code: GatewayCode,
    pub store: Arc<InMemoryCommerceStore>,
    pub events: Arc<InMemoryEventBus>,
    pub gateways: Arc<MockGatewayResolver>,
    pub adapter: Arc<MockGatewayAdapter>,
    /// One-time product priced at 2 750 cents.
    pub course: Product,
    /// Recurring plan at 3 000 / 30 000 cents.
    pub plan: Product,
}

impl Harness {
    pub async fn new() -> Self {
        let tenant = TenantId::new();
        let code = GatewayCode::new("mock").unwrap();
        let store = Arc::new(InMemoryCommerceStore::new());
        let adapter = Arc::new(MockGatewayAdapter::new(GatewayKind::RedirectCheckout, MOCK_SECRET));
        let gateways = Arc::new(MockGatewayResolver::new());
        gateways.register(tenant, code.clone(), adapter.clone());

        let course = product(tenant, 2_750);
        let plan = plan(tenant, 3_000, 30_000);
        store.insert_product(course.clone()).await;
        store.insert_product(plan.clone()).await;

        Self {
            tenant,
            code,
            store,
            events: Arc::new(InMemoryEventBus::new()),
            gateways,
            adapter,
            course,
            plan,
        }
    }

    /// Persists a pending order for `quantity` of the course.
    pub async fn course_order(&self, quantity: u32) -> Order {
        self.persist(OrderType::OneTime, vec![line(&self.course, quantity)], None)
            .await
    }

    /// Persists a pending subscription order for the plan.
    pub async fn plan_order(&self, cycle: BillingCycle) -> Order {
        let mut plan_line = line(&self.plan, 1);
        plan_line.cycle = Some(cycle);
        self.persist(OrderType::Subscription, vec![plan_line], None).await
    }

    pub async fn persist(
        &self,
        order_type: OrderType,
        lines: Vec<LineRequest>,
        renews: Option<crate::domain::foundation::SubscriptionId>,
    ) -> Order {
        let mut request = new_order(self.tenant, order_type, lines);
        request.renews = renews;
        let order = Order::create(
            request,
            &[self.course.clone(), self.plan.clone()],
            Timestamp::now(),
        )
        .unwrap();
        OrderRepository::create(self.store.as_ref(), &order).await.unwrap();
        order
    }
}

/// Body and signature of a mock processor callback.
pub fn signed_callback(reference: &str, status: &str, amount: Option<i64>) -> (Vec<u8>, String) {
    let mut body = json!({ "reference": reference, "status": status });
    if let Some(amount) = amount {
        body["amount"] = json!(amount);
    }
    sign(body)
}

/// Callback that also echoes our attempt id, as processors do with metadata.
pub fn signed_callback_for(transaction_id: TransactionId, reference: &str, status: &str) -> (Vec<u8>, String) {
    sign(json!({
        "reference": reference,
        "status": status,
        "transaction_id": transaction_id.to_string(),
    }))
}

fn sign(body: serde_json::Value) -> (Vec<u8>, String) {
    let bytes = serde_json::to_vec(&body).unwrap();
    let signature = sign_body(MOCK_SECRET.as_bytes(), &bytes).unwrap();
    (bytes, signature)
}
