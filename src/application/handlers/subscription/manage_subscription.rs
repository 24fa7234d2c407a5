//! ManageSubscriptionHandler - lifecycle actions.
//!
//! Each action runs under the subscription's row lock. Repeating an action
//! that is already in effect returns the current snapshot unchanged.
//! Buyers act on their own subscriptions; manual renewal is operator-only.

use std::sync::Arc;

use serde::Deserialize;

use crate::application::handlers::notify;
use crate::domain::foundation::{DomainError, EventId, SubscriptionId, TenantId, Timestamp};
use crate::domain::subscription::{
    ProductSubscription, SubscriptionError, SubscriptionRenewed, SubscriptionStatusChanged,
};
use crate::ports::{EventPublisher, SubscriptionChange, SubscriptionRepository};

use super::SubscriptionActor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    /// Confirms a period paid outside the gateway flow.
    Renew,
    Pause,
    Resume,
    Cancel { at_period_end: bool },
}

impl SubscriptionAction {
    fn apply(
        self,
        actor: &SubscriptionActor,
        subscription: &mut ProductSubscription,
        now: Timestamp,
    ) -> Result<SubscriptionChange, SubscriptionError> {
        actor.ensure_can_act_on(subscription)?;
        if self == SubscriptionAction::Renew && !actor.is_operator() {
            return Err(SubscriptionError::OperatorOnly("renew"));
        }
        let from = subscription.status;
        let changed = match self {
            SubscriptionAction::Renew => {
                subscription.activate_or_renew(now)?;
                true
            }
            SubscriptionAction::Pause => subscription.pause(now)?,
            SubscriptionAction::Resume => subscription.resume(now)?,
            SubscriptionAction::Cancel { at_period_end } => subscription.cancel(at_period_end, now)?,
        };
        Ok(if changed {
            SubscriptionChange::Applied { from }
        } else {
            SubscriptionChange::Unchanged
        })
    }
}

#[derive(Debug, Clone)]
pub struct ManageSubscriptionCommand {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub actor: SubscriptionActor,
    pub action: SubscriptionAction,
}

pub struct ManageSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    events: Arc<dyn EventPublisher>,
}

impl ManageSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            subscriptions,
            events,
        }
    }

    pub async fn handle(&self, cmd: ManageSubscriptionCommand) -> Result<ProductSubscription, DomainError> {
        let now = Timestamp::now();
        let action = cmd.action;
        let actor = cmd.actor;
        let (subscription, change) = self
            .subscriptions
            .modify(
                cmd.tenant_id,
                cmd.subscription_id,
                Box::new(move |sub| action.apply(&actor, sub, now)),
            )
            .await?;

        let SubscriptionChange::Applied { from } = change else {
            return Ok(subscription);
        };

        tracing::info!(
            tenant_id = %subscription.tenant_id,
            subscription_id = %subscription.id,
            action = ?action,
            from = %from,
            to = %subscription.status,
            "Subscription updated"
        );

        let mut envelopes = Vec::new();
        if action == SubscriptionAction::Renew {
            envelopes.extend(notify::envelope(
                &SubscriptionRenewed {
                    event_id: EventId::new(),
                    tenant_id: subscription.tenant_id,
                    subscription_id: subscription.id,
                    period_start: subscription.current_period_start,
                    period_end: subscription.current_period_end,
                    occurred_at: now,
                },
                subscription.tenant_id,
            ));
        }
        if from != subscription.status {
            envelopes.extend(notify::envelope(
                &SubscriptionStatusChanged {
                    event_id: EventId::new(),
                    tenant_id: subscription.tenant_id,
                    subscription_id: subscription.id,
                    from,
                    to: subscription.status,
                    occurred_at: now,
                },
                subscription.tenant_id,
            ));
        }
        notify::publish(self.events.as_ref(), envelopes).await;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::foundation::{BuyerId, ErrorCode};
    use crate::domain::subscription::test_support::active_for_30_days;
    use crate::domain::subscription::SubscriptionStatus;

    async fn seeded(h: &Harness) -> ProductSubscription {
        let mut sub = active_for_30_days(Timestamp::now());
        sub.tenant_id = h.tenant;
        SubscriptionRepository::create(h.store.as_ref(), &sub).await.unwrap();
        sub
    }

    fn handler(h: &Harness) -> ManageSubscriptionHandler {
        ManageSubscriptionHandler::new(h.store.clone(), h.events.clone())
    }

    fn command(h: &Harness, sub: &ProductSubscription, action: SubscriptionAction) -> ManageSubscriptionCommand {
        let actor = match action {
            SubscriptionAction::Renew => SubscriptionActor::Operator,
            _ => SubscriptionActor::Buyer(sub.buyer_id.clone()),
        };
        ManageSubscriptionCommand {
            tenant_id: h.tenant,
            subscription_id: sub.id,
            actor,
            action,
        }
    }

    #[tokio::test]
    async fn pause_then_resume_extends_period() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let handler = handler(&h);

        let paused = handler.handle(command(&h, &sub, SubscriptionAction::Pause)).await.unwrap();
        assert_eq!(paused.status, SubscriptionStatus::Paused);

        let resumed = handler.handle(command(&h, &sub, SubscriptionAction::Resume)).await.unwrap();
        assert_eq!(resumed.status, SubscriptionStatus::Active);
        assert!(resumed.current_period_end >= sub.current_period_end);
        assert!(resumed.paused_at.is_none());
        assert_eq!(h.events.events_of_type("subscription.status_changed.v1").len(), 2);
    }

    #[tokio::test]
    async fn repeated_pause_is_a_silent_no_op() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let handler = handler(&h);

        handler.handle(command(&h, &sub, SubscriptionAction::Pause)).await.unwrap();
        let again = handler.handle(command(&h, &sub, SubscriptionAction::Pause)).await.unwrap();

        assert_eq!(again.status, SubscriptionStatus::Paused);
        assert_eq!(h.events.event_count(), 1);
    }

    #[tokio::test]
    async fn cancel_at_period_end_keeps_period() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;

        let canceled = handler(&h)
            .handle(command(&h, &sub, SubscriptionAction::Cancel { at_period_end: true }))
            .await
            .unwrap();

        assert_eq!(canceled.status, SubscriptionStatus::CancelPending);
        assert_eq!(canceled.current_period_end, sub.current_period_end);
        assert!(canceled.canceled_at.is_some());
    }

    #[tokio::test]
    async fn manual_renew_advances_period_and_notifies() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;

        let renewed = handler(&h)
            .handle(command(&h, &sub, SubscriptionAction::Renew))
            .await
            .unwrap();

        assert_eq!(renewed.current_period_start, sub.current_period_end);
        assert!(h.events.has_event("subscription.renewed.v1"));
        assert!(!h.events.has_event("subscription.status_changed.v1"));
    }

    #[tokio::test]
    async fn resume_of_canceled_subscription_is_illegal_and_not_written() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let handler = handler(&h);
        handler
            .handle(command(&h, &sub, SubscriptionAction::Cancel { at_period_end: false }))
            .await
            .unwrap();

        let err = handler
            .handle(command(&h, &sub, SubscriptionAction::Resume))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::IllegalSubscriptionTransition);
        let stored = SubscriptionRepository::find_by_id(h.store.as_ref(), h.tenant, sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn other_tenant_cannot_touch_subscription() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let mut cmd = command(&h, &sub, SubscriptionAction::Pause);
        cmd.tenant_id = TenantId::new();

        let err = handler(&h).handle(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn buyer_cannot_act_on_another_buyers_subscription() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let mut cmd = command(&h, &sub, SubscriptionAction::Cancel { at_period_end: false });
        cmd.actor = SubscriptionActor::Buyer(BuyerId::new("buyer-intruder").unwrap());

        let err = handler(&h).handle(cmd).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
        let stored = SubscriptionRepository::find_by_id(h.store.as_ref(), h.tenant, sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn buyer_cannot_renew_without_payment() {
        let h = Harness::new().await;
        let sub = seeded(&h).await;
        let mut cmd = command(&h, &sub, SubscriptionAction::Renew);
        cmd.actor = SubscriptionActor::Buyer(sub.buyer_id.clone());

        let err = handler(&h).handle(cmd).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Forbidden);
        let stored = SubscriptionRepository::find_by_id(h.store.as_ref(), h.tenant, sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_period_end, sub.current_period_end);
    }
}
