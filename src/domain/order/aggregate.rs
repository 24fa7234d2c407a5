//! Order aggregate.
//!
//! An Order is one priced purchase intent. Its total is computed once, from
//! current catalog prices, and never changes afterwards.
//!
//! # Design Decisions
//!
//! - **Money in cents**: All monetary values are i64 minor units
//! - **Server-side pricing**: client-supplied totals are never read
//! - **No deletion**: orders only ever reach a terminal status

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{BillingCycle, Product};
use crate::domain::foundation::{
    BuyerId, Currency, GatewayCode, OrderId, ProductId, StateMachine, SubscriptionId, TenantId,
    Timestamp, ValidationError,
};

use super::{OrderError, OrderStatus};

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// Purchase shape; decides which product capabilities are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    OneTime,
    Subscription,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::OneTime => "one_time",
            OrderType::Subscription => "subscription",
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(OrderType::OneTime),
            "subscription" => Ok(OrderType::Subscription),
            other => Err(format!("Invalid order type: {}", other)),
        }
    }
}

/// Billing details captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingSnapshot {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO-3166 alpha-2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl BillingSnapshot {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("billing.name"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::empty_field("billing.email"));
        }
        if !self.email.contains('@') {
            return Err(ValidationError::invalid_format(
                "billing.email",
                "missing @ symbol",
            ));
        }
        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ValidationError::invalid_format(
                    "billing.country",
                    "must be a two-letter country code",
                ));
            }
        }
        Ok(())
    }
}

/// A requested checkout line before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Billing cycle for a recurring line; defaults to monthly in subscription orders.
    #[serde(default)]
    pub cycle: Option<BillingCycle>,
}

/// An immutable, priced purchase line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// `Some` when this line creates a subscription on successful payment.
    pub subscription: Option<BillingCycle>,
}

/// Order aggregate.
///
/// # Invariants
///
/// - `total_amount_cents` equals the sum of item line totals
/// - `items` is non-empty and shares the order currency
/// - Status changes follow [`OrderStatus`] edges only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    /// Human-readable number, e.g. `ORD-20240315-1A2B3C4D`.
    pub order_number: String,
    pub buyer_id: BuyerId,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub total_amount_cents: i64,
    pub currency: Currency,
    /// Gateway chosen at checkout; `None` means the tenant default.
    pub gateway_code: Option<GatewayCode>,
    pub billing: BillingSnapshot,
    pub items: Vec<OrderItem>,
    /// Existing subscription this order pays the next period of.
    pub subscription_id: Option<SubscriptionId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for [`Order::create`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
    pub order_type: OrderType,
    pub lines: Vec<LineRequest>,
    pub billing: BillingSnapshot,
    pub gateway_code: Option<GatewayCode>,
    /// Set when paying a renewal (or trial conversion) of an existing subscription.
    pub renews: Option<SubscriptionId>,
}

impl Order {
    /// Prices `request.lines` against `products` and builds a pending order.
    ///
    /// `products` must be the catalog's current view; any product absent from
    /// it, or owned by another tenant, is rejected.
    pub fn create(
        request: NewOrder,
        products: &[Product],
        now: Timestamp,
    ) -> Result<Self, OrderError> {
        request.billing.validate()?;
        if request.lines.is_empty() {
            return Err(ValidationError::empty_field("items").into());
        }
        if request.renews.is_some() && request.order_type != OrderType::Subscription {
            return Err(ValidationError::invalid_format(
                "renews",
                "only a subscription order can renew a subscription",
            )
            .into());
        }

        let mut items = Vec::with_capacity(request.lines.len());
        let mut currency: Option<Currency> = None;

        for line in &request.lines {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id && p.tenant_id == request.tenant_id)
                .ok_or_else(|| {
                    ValidationError::invalid_format(
                        "items.product_id",
                        format!("product {} is not sold by this tenant", line.product_id),
                    )
                })?;

            let item = price_line(line, product, request.order_type)?;

            match &currency {
                None => currency = Some(product.currency.clone()),
                Some(existing) if *existing != product.currency => {
                    return Err(ValidationError::invalid_format(
                        "items",
                        "all items must share one currency",
                    )
                    .into());
                }
                Some(_) => {}
            }
            items.push(item);
        }

        if request.order_type == OrderType::Subscription {
            let recurring = items.iter().filter(|i| i.subscription.is_some()).count();
            if recurring != 1 {
                return Err(ValidationError::invalid_format(
                    "items",
                    "a subscription order must contain exactly one plan",
                )
                .into());
            }
        }

        let total_amount_cents = items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.line_total_cents))
            .ok_or_else(|| ValidationError::invalid_format("items", "order total overflows"))?;

        let currency = currency.ok_or_else(|| ValidationError::empty_field("items"))?;
        let id = OrderId::new();

        Ok(Self {
            id,
            tenant_id: request.tenant_id,
            order_number: order_number(&id, now),
            buyer_id: request.buyer_id,
            status: OrderStatus::Pending,
            order_type: request.order_type,
            total_amount_cents,
            currency,
            gateway_code: request.gateway_code,
            billing: request.billing,
            items,
            subscription_id: request.renews,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a status change.
    ///
    /// Returns `Ok(false)` when the order is already in `to`, so redelivered
    /// confirmations are harmless.
    pub fn transition(&mut self, to: OrderStatus, now: Timestamp) -> Result<bool, OrderError> {
        if self.status == to {
            return Ok(false);
        }
        self.status = self
            .status
            .transition_to(to)
            .map_err(|_| OrderError::illegal(self.status, to))?;
        self.updated_at = now;
        Ok(true)
    }

    /// Walks legal edges until `to` is reached. Each edge is validated.
    pub fn advance_to(&mut self, to: OrderStatus, now: Timestamp) -> Result<bool, OrderError> {
        let path = self
            .status
            .path_to(to)
            .ok_or_else(|| OrderError::illegal(self.status, to))?;
        let changed = !path.is_empty();
        for step in path {
            self.transition(step, now)?;
        }
        Ok(changed)
    }

    pub fn is_subscription(&self) -> bool {
        self.order_type == OrderType::Subscription
    }

    /// The line that creates a subscription, if any.
    pub fn subscription_line(&self) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.subscription.is_some())
    }

    /// Sum of item line totals.
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(|item| item.line_total_cents).sum()
    }
}

fn price_line(
    line: &LineRequest,
    product: &Product,
    order_type: OrderType,
) -> Result<OrderItem, OrderError> {
    if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::out_of_range(
            "items.quantity",
            1,
            MAX_LINE_QUANTITY as i64,
            line.quantity as i64,
        )
        .into());
    }
    if !product.active {
        return Err(OrderError::not_eligible(product.id, "product is not for sale"));
    }

    let (unit_price_cents, subscription) = match order_type {
        OrderType::Subscription => {
            let cycle = line.cycle.unwrap_or_default();
            let price = product.recurring_price(cycle).ok_or_else(|| {
                OrderError::not_eligible(product.id, "product does not support subscriptions")
            })?;
            if line.quantity != 1 {
                return Err(ValidationError::out_of_range(
                    "items.quantity",
                    1,
                    1,
                    line.quantity as i64,
                )
                .into());
            }
            (price, Some(cycle))
        }
        OrderType::OneTime => {
            if line.cycle.is_some() {
                return Err(ValidationError::invalid_format(
                    "items.cycle",
                    "billing cycle is only valid in a subscription order",
                )
                .into());
            }
            (product.price_cents, None)
        }
    };

    if unit_price_cents < 0 {
        return Err(OrderError::not_eligible(product.id, "product has a negative price"));
    }

    let line_total_cents = unit_price_cents
        .checked_mul(line.quantity as i64)
        .ok_or_else(|| ValidationError::invalid_format("items", "line total overflows"))?;

    Ok(OrderItem {
        product_id: product.id,
        name: product.name.clone(),
        quantity: line.quantity,
        unit_price_cents,
        line_total_cents,
        subscription,
    })
}

fn order_number(id: &OrderId, now: Timestamp) -> String {
    let suffix: String = id
        .as_uuid()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("ORD-{}-{}", now.as_datetime().format("%Y%m%d"), suffix)
}
