//! ProductSubscription aggregate.
//!
//! A subscription is created by the first successful subscription payment
//! (or by a free trial) and afterwards only changes through the methods below.
//!
//! # Invariants
//!
//! - `paused_at` is `Some` only while `status == Paused`
//! - `ends_at` is set by an effective cancellation (and shifted by resume)
//! - `current_period_start <= current_period_end`

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::BillingCycle;
use crate::domain::foundation::{
    BuyerId, Currency, OrderId, ProductId, StateMachine, SubscriptionId, TenantId, Timestamp,
};

use super::{calculate_proration, Proration, SubscriptionError, SubscriptionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSubscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    /// Order whose payment created this subscription; `None` for trials.
    pub order_id: Option<OrderId>,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    /// Price of one period.
    pub amount_cents: i64,
    pub currency: Currency,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub trial_ends_at: Option<Timestamp>,
    pub paused_at: Option<Timestamp>,
    pub past_due_since: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Everything needed to open a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
    pub product_id: ProductId,
    pub order_id: Option<OrderId>,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub currency: Currency,
}

impl ProductSubscription {
    /// Opens a paid subscription whose first period starts now.
    pub fn activate_new(new: NewSubscription, now: Timestamp) -> Self {
        let period_end = new.billing_cycle.period_end(now);
        Self::build(new, SubscriptionStatus::Active, now, period_end, None)
    }

    /// Opens a free trial lasting `trial_days`.
    pub fn start_trial(new: NewSubscription, trial_days: u32, now: Timestamp) -> Self {
        let trial_end = now.add_days(trial_days as i64);
        Self::build(new, SubscriptionStatus::Trial, now, trial_end, Some(trial_end))
    }

    fn build(
        new: NewSubscription,
        status: SubscriptionStatus,
        period_start: Timestamp,
        period_end: Timestamp,
        trial_ends_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            tenant_id: new.tenant_id,
            buyer_id: new.buyer_id,
            product_id: new.product_id,
            order_id: new.order_id,
            status,
            billing_cycle: new.billing_cycle,
            amount_cents: new.amount_cents,
            currency: new.currency,
            current_period_start: period_start,
            current_period_end: period_end,
            trial_ends_at,
            paused_at: None,
            past_due_since: None,
            canceled_at: None,
            ends_at: None,
            created_at: period_start,
            updated_at: period_start,
        }
    }

    /// Starts the next paid period.
    ///
    /// The new period begins at the later of the current period end and `now`,
    /// so early payment never forfeits paid days and late payment never
    /// back-charges lapsed ones.
    pub fn activate_or_renew(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        self.transition(SubscriptionStatus::Active, "renew", now)?;
        let start = self.current_period_end.max(now);
        self.current_period_start = start;
        self.current_period_end = self.billing_cycle.period_end(start);
        self.past_due_since = None;
        self.trial_ends_at = None;
        Ok(())
    }

    /// Returns `Ok(false)` when already paused.
    pub fn pause(&mut self, now: Timestamp) -> Result<bool, SubscriptionError> {
        if self.status == SubscriptionStatus::Paused {
            return Ok(false);
        }
        if self.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::illegal(self.status, "pause"));
        }
        self.transition(SubscriptionStatus::Paused, "pause", now)?;
        self.paused_at = Some(now);
        Ok(true)
    }

    /// Reactivates a paused subscription, extending the period (and any
    /// scheduled end) by exactly the time spent paused.
    ///
    /// Returns `Ok(false)` when already active.
    pub fn resume(&mut self, now: Timestamp) -> Result<bool, SubscriptionError> {
        if self.status == SubscriptionStatus::Active && self.paused_at.is_none() {
            return Ok(false);
        }
        if self.status != SubscriptionStatus::Paused {
            return Err(SubscriptionError::illegal(self.status, "resume"));
        }
        self.credit_pause(now);
        self.transition(SubscriptionStatus::Active, "resume", now)?;
        Ok(true)
    }

    /// Cancels at period end (`cancel_pending`) or immediately (`canceled`).
    ///
    /// Returns `Ok(false)` when the requested cancellation is already in effect.
    pub fn cancel(&mut self, at_period_end: bool, now: Timestamp) -> Result<bool, SubscriptionError> {
        if at_period_end {
            if self.status == SubscriptionStatus::CancelPending {
                return Ok(false);
            }
            self.transition(SubscriptionStatus::CancelPending, "cancel", now)?;
            self.credit_pause(now);
            self.canceled_at = Some(now);
        } else {
            if self.status == SubscriptionStatus::Canceled {
                return Ok(false);
            }
            self.transition(SubscriptionStatus::Canceled, "cancel", now)?;
            self.paused_at = None;
            self.canceled_at = Some(now);
            self.ends_at = Some(now);
        }
        Ok(true)
    }

    /// A renewal payment failed. Returns `Ok(false)` when already past due.
    pub fn mark_past_due(&mut self, now: Timestamp) -> Result<bool, SubscriptionError> {
        if self.status == SubscriptionStatus::PastDue {
            return Ok(false);
        }
        self.transition(SubscriptionStatus::PastDue, "mark past due", now)?;
        self.past_due_since = Some(now);
        Ok(true)
    }

    /// Ends a `cancel_pending` subscription whose period has run out.
    pub fn finalize_cancellation(&mut self, now: Timestamp) -> Result<bool, SubscriptionError> {
        if self.status != SubscriptionStatus::CancelPending || self.current_period_end > now {
            return Ok(false);
        }
        self.transition(SubscriptionStatus::Canceled, "finalize", now)?;
        self.ends_at = Some(self.current_period_end);
        Ok(true)
    }

    /// Ends a `past_due` subscription whose grace window has elapsed.
    pub fn expire_grace(&mut self, now: Timestamp, grace_days: u32) -> Result<bool, SubscriptionError> {
        let Some(since) = self.past_due_since else {
            return Ok(false);
        };
        if self.status != SubscriptionStatus::PastDue || since.add_days(grace_days as i64) > now {
            return Ok(false);
        }
        self.transition(SubscriptionStatus::Canceled, "expire", now)?;
        self.canceled_at = Some(now);
        self.ends_at = Some(now);
        Ok(true)
    }

    /// Proration for switching to a plan costing `new_amount_cents` per period.
    pub fn calculate_proration(&self, new_amount_cents: i64, now: Timestamp) -> Proration {
        calculate_proration(
            self.current_period_start,
            self.current_period_end,
            now,
            self.amount_cents,
            new_amount_cents,
        )
    }

    /// Switches plan mid-period. The current period is kept; the returned
    /// proration is what the buyer owes for the remainder.
    pub fn change_plan(
        &mut self,
        product_id: ProductId,
        billing_cycle: BillingCycle,
        amount_cents: i64,
        now: Timestamp,
    ) -> Result<Proration, SubscriptionError> {
        if !matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) {
            return Err(SubscriptionError::illegal(self.status, "change the plan of"));
        }
        let proration = self.calculate_proration(amount_cents, now);
        self.product_id = product_id;
        self.billing_cycle = billing_cycle;
        self.amount_cents = amount_cents;
        self.updated_at = now;
        Ok(proration)
    }

    /// Shifts the period end (and any scheduled end) by the paused duration.
    fn credit_pause(&mut self, now: Timestamp) {
        if let Some(paused_at) = self.paused_at.take() {
            let paused_for = now.duration_since(&paused_at).max(Duration::zero());
            self.current_period_end = self.current_period_end.plus(paused_for);
            self.ends_at = self.ends_at.map(|ends_at| ends_at.plus(paused_for));
        }
    }

    fn transition(
        &mut self,
        target: SubscriptionStatus,
        action: &'static str,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| SubscriptionError::illegal(self.status, action))?;
        self.updated_at = now;
        Ok(())
    }
}
