//! Subscription domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BuyerId, EventId, SubscriptionId, TenantId, Timestamp};
use crate::domain_event;

use super::SubscriptionStatus;

/// First paid period started (including trial conversion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionActivated {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub buyer_id: BuyerId,
    pub period_end: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionActivated,
    event_type = "subscription.activated.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRenewed {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionRenewed,
    event_type = "subscription.renewed.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPastDue {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionPastDue,
    event_type = "subscription.past_due.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);

/// Status changed through a buyer action or a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatusChanged {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub from: SubscriptionStatus,
    pub to: SubscriptionStatus,
    pub occurred_at: Timestamp,
}

domain_event!(
    SubscriptionStatusChanged,
    event_type = "subscription.status_changed.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = occurred_at,
    event_id = event_id
);
