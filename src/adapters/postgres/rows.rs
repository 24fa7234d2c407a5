//! Database row shapes and their conversions into domain types.
//!
//! Enums are stored as their snake_case names. Order lines, billing
//! snapshots, and attempt payloads are stored as JSONB.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Row};
use uuid::Uuid;

use crate::domain::catalog::{Product, RecurringTerms};
use crate::domain::foundation::{
    BuyerId, Currency, DomainError, ErrorCode, GatewayCode, GatewaySettingId, OrderId, ProductId,
    SubscriptionId, TenantId, Timestamp, TransactionId,
};
use crate::domain::gateway::{GatewayCredentials, GatewaySetting, SecretField};
use crate::domain::order::{Order, Transaction};
use crate::domain::subscription::ProductSubscription;

pub(super) fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn parse<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, value: JsonValue) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} JSON: {}", column, e))
    })
}

pub(super) fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> Result<JsonValue, DomainError> {
    serde_json::to_value(value).map_err(|e| {
        DomainError::new(ErrorCode::InternalError, format!("Failed to encode {}: {}", column, e))
    })
}

fn currency(value: &str) -> Result<Currency, DomainError> {
    Currency::new(value).map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
}

fn timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

// ════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════

pub(super) const ORDER_COLUMNS: &str = "id, tenant_id, order_number, buyer_id, status, order_type, \
     total_amount_cents, currency, gateway_code, billing, items, subscription_id, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct OrderRow {
    id: Uuid,
    tenant_id: Uuid,
    order_number: String,
    buyer_id: String,
    status: String,
    order_type: String,
    total_amount_cents: i64,
    currency: String,
    gateway_code: Option<String>,
    billing: JsonValue,
    items: JsonValue,
    subscription_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            order_number: row.order_number,
            buyer_id: BuyerId::new(row.buyer_id)?,
            status: parse("orders.status", &row.status)?,
            order_type: parse("orders.order_type", &row.order_type)?,
            total_amount_cents: row.total_amount_cents,
            currency: currency(&row.currency)?,
            gateway_code: row.gateway_code.map(GatewayCode::new).transpose()?,
            billing: decode_json("orders.billing", row.billing)?,
            items: decode_json("orders.items", row.items)?,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

/// Loads and row-locks an order for the rest of the enclosing transaction.
pub(super) async fn lock_order(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    id: OrderId,
) -> Result<Order, DomainError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(id.as_uuid())
    .bind(tenant_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to lock order", e))?;

    row.map(Order::try_from)
        .transpose()?
        .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, format!("Order not found: {}", id)))
}

pub(super) async fn update_order(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE orders SET
            status = $2,
            gateway_code = $3,
            subscription_id = $4,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.status.as_str())
    .bind(order.gateway_code.as_ref().map(|c| c.as_str()))
    .bind(order.subscription_id.map(|id| *id.as_uuid()))
    .bind(order.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to update order", e))?;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Transactions
// ════════════════════════════════════════════════════════════════════════════

pub(super) const TRANSACTION_COLUMNS: &str = "id, tenant_id, order_id, gateway_code, attempt_number, \
     external_reference, status, amount_cents, payload, split, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    order_id: Uuid,
    gateway_code: String,
    attempt_number: i32,
    external_reference: Option<String>,
    status: String,
    amount_cents: i64,
    payload: JsonValue,
    split: Option<JsonValue>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            order_id: OrderId::from_uuid(row.order_id),
            gateway_code: GatewayCode::new(row.gateway_code)?,
            attempt_number: row.attempt_number.max(1) as u32,
            external_reference: row.external_reference,
            status: parse("transactions.status", &row.status)?,
            amount_cents: row.amount_cents,
            payload: row.payload,
            split: row
                .split
                .map(|value| decode_json("transactions.split", value))
                .transpose()?,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

pub(super) async fn update_transaction(
    conn: &mut PgConnection,
    transaction: &Transaction,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE transactions SET
            external_reference = $2,
            status = $3,
            payload = $4,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(transaction.id.as_uuid())
    .bind(&transaction.external_reference)
    .bind(transaction.status.as_str())
    .bind(&transaction.payload)
    .bind(transaction.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to update transaction", e))?;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════

pub(super) const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, buyer_id, product_id, order_id, status, \
     billing_cycle, amount_cents, currency, current_period_start, current_period_end, trial_ends_at, \
     paused_at, past_due_since, canceled_at, ends_at, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    buyer_id: String,
    product_id: Uuid,
    order_id: Option<Uuid>,
    status: String,
    billing_cycle: String,
    amount_cents: i64,
    currency: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    trial_ends_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    past_due_since: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for ProductSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(ProductSubscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            buyer_id: BuyerId::new(row.buyer_id)?,
            product_id: ProductId::from_uuid(row.product_id),
            order_id: row.order_id.map(OrderId::from_uuid),
            status: parse("subscriptions.status", &row.status)?,
            billing_cycle: parse("subscriptions.billing_cycle", &row.billing_cycle)?,
            amount_cents: row.amount_cents,
            currency: currency(&row.currency)?,
            current_period_start: timestamp(row.current_period_start),
            current_period_end: timestamp(row.current_period_end),
            trial_ends_at: row.trial_ends_at.map(timestamp),
            paused_at: row.paused_at.map(timestamp),
            past_due_since: row.past_due_since.map(timestamp),
            canceled_at: row.canceled_at.map(timestamp),
            ends_at: row.ends_at.map(timestamp),
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

/// Inserts a subscription or overwrites its mutable columns.
pub(super) async fn save_subscription(
    conn: &mut PgConnection,
    sub: &ProductSubscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, tenant_id, buyer_id, product_id, order_id, status, billing_cycle,
            amount_cents, currency, current_period_start, current_period_end,
            trial_ends_at, paused_at, past_due_since, canceled_at, ends_at,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ON CONFLICT (id) DO UPDATE SET
            product_id = EXCLUDED.product_id,
            status = EXCLUDED.status,
            billing_cycle = EXCLUDED.billing_cycle,
            amount_cents = EXCLUDED.amount_cents,
            current_period_start = EXCLUDED.current_period_start,
            current_period_end = EXCLUDED.current_period_end,
            trial_ends_at = EXCLUDED.trial_ends_at,
            paused_at = EXCLUDED.paused_at,
            past_due_since = EXCLUDED.past_due_since,
            canceled_at = EXCLUDED.canceled_at,
            ends_at = EXCLUDED.ends_at,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(sub.id.as_uuid())
    .bind(sub.tenant_id.as_uuid())
    .bind(sub.buyer_id.as_str())
    .bind(sub.product_id.as_uuid())
    .bind(sub.order_id.map(|id| *id.as_uuid()))
    .bind(sub.status.as_str())
    .bind(sub.billing_cycle.as_str())
    .bind(sub.amount_cents)
    .bind(sub.currency.as_str())
    .bind(sub.current_period_start.as_datetime())
    .bind(sub.current_period_end.as_datetime())
    .bind(sub.trial_ends_at.as_ref().map(|t| *t.as_datetime()))
    .bind(sub.paused_at.as_ref().map(|t| *t.as_datetime()))
    .bind(sub.past_due_since.as_ref().map(|t| *t.as_datetime()))
    .bind(sub.canceled_at.as_ref().map(|t| *t.as_datetime()))
    .bind(sub.ends_at.as_ref().map(|t| *t.as_datetime()))
    .bind(sub.created_at.as_datetime())
    .bind(sub.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to save subscription", e))?;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Gateway settings
// ════════════════════════════════════════════════════════════════════════════

pub(super) const SETTING_COLUMNS: &str = "id, tenant_id, code, kind, mode, enabled, is_default, \
     api_key_ciphertext, api_key_masked, signing_secret_ciphertext, signing_secret_masked, \
     public_key, merchant_id, api_base_url, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(super) struct GatewaySettingRow {
    id: Uuid,
    tenant_id: Uuid,
    code: String,
    kind: String,
    mode: String,
    enabled: bool,
    is_default: bool,
    api_key_ciphertext: String,
    api_key_masked: String,
    signing_secret_ciphertext: String,
    signing_secret_masked: String,
    public_key: Option<String>,
    merchant_id: Option<String>,
    api_base_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GatewaySettingRow> for GatewaySetting {
    type Error = DomainError;

    fn try_from(row: GatewaySettingRow) -> Result<Self, Self::Error> {
        Ok(GatewaySetting {
            id: GatewaySettingId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            code: GatewayCode::new(row.code)?,
            kind: parse("gateway_settings.kind", &row.kind)?,
            mode: parse("gateway_settings.mode", &row.mode)?,
            enabled: row.enabled,
            is_default: row.is_default,
            credentials: GatewayCredentials {
                api_key: SecretField::from_parts(row.api_key_ciphertext, row.api_key_masked),
                signing_secret: SecretField::from_parts(
                    row.signing_secret_ciphertext,
                    row.signing_secret_masked,
                ),
                public_key: row.public_key,
                merchant_id: row.merchant_id,
            },
            api_base_url: row.api_base_url,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Products
// ════════════════════════════════════════════════════════════════════════════

pub(super) const PRODUCT_COLUMNS: &str = "id, tenant_id, name, currency, price_cents, active, \
     monthly_price_cents, yearly_price_cents, trial_days";

/// Products decode by hand: recurring terms exist only when both prices do.
pub(super) fn product_from_row(row: &PgRow) -> Result<Product, DomainError> {
    let get_err = |e: sqlx::Error| db_error("Failed to decode product", e);

    let monthly: Option<i64> = row.try_get("monthly_price_cents").map_err(get_err)?;
    let yearly: Option<i64> = row.try_get("yearly_price_cents").map_err(get_err)?;
    let trial_days: i32 = row.try_get("trial_days").map_err(get_err)?;
    let currency_code: String = row.try_get("currency").map_err(get_err)?;

    let recurring = match (monthly, yearly) {
        (Some(monthly_price_cents), Some(yearly_price_cents)) => Some(RecurringTerms {
            monthly_price_cents,
            yearly_price_cents,
            trial_days: trial_days.max(0) as u32,
        }),
        _ => None,
    };

    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(get_err)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(get_err)?),
        name: row.try_get("name").map_err(get_err)?,
        currency: currency(currency_code.trim())?,
        price_cents: row.try_get("price_cents").map_err(get_err)?,
        active: row.try_get("active").map_err(get_err)?,
        recurring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::subscription::SubscriptionStatus;

    #[test]
    fn stored_enum_names_parse_back() {
        let status: OrderStatus = parse("orders.status", OrderStatus::Processing.as_str()).unwrap();
        assert_eq!(status, OrderStatus::Processing);
        let status: SubscriptionStatus =
            parse("subscriptions.status", SubscriptionStatus::CancelPending.as_str()).unwrap();
        assert_eq!(status, SubscriptionStatus::CancelPending);
    }

    #[test]
    fn unknown_enum_value_is_a_database_error() {
        let err = parse::<OrderStatus>("orders.status", "teleported").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("teleported"));
    }

    #[test]
    fn corrupt_json_is_a_database_error() {
        let err = decode_json::<Vec<crate::domain::order::OrderItem>>(
            "orders.items",
            serde_json::json!({"not": "a list"}),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
