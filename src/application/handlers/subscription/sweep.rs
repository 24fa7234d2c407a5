//! SweepSubscriptionsHandler - periodic closing of lapsed subscriptions.
//!
//! Finalizes `cancel_pending` subscriptions whose period has ended and
//! cancels `past_due` ones whose grace window has elapsed. A failure on one
//! subscription is logged and the sweep continues.

use std::sync::Arc;

use serde::Serialize;

use crate::application::handlers::notify;
use crate::domain::foundation::{DomainError, EventId, Timestamp};
use crate::domain::subscription::{SubscriptionStatus, SubscriptionStatusChanged};
use crate::ports::{EventPublisher, SubscriptionChange, SubscriptionRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub finalized: u32,
    pub expired: u32,
    pub failed: u32,
}

pub struct SweepSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    events: Arc<dyn EventPublisher>,
    grace_period_days: u32,
}

impl SweepSubscriptionsHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        events: Arc<dyn EventPublisher>,
        grace_period_days: u32,
    ) -> Self {
        Self {
            subscriptions,
            events,
            grace_period_days,
        }
    }

    pub async fn handle(&self, now: Timestamp) -> Result<SweepReport, DomainError> {
        let candidates = self.subscriptions.find_sweep_candidates(now).await?;
        let grace_days = self.grace_period_days;
        let mut report = SweepReport::default();
        let mut envelopes = Vec::new();

        for candidate in candidates {
            let result = self
                .subscriptions
                .modify(
                    candidate.tenant_id,
                    candidate.id,
                    Box::new(move |sub| {
                        let from = sub.status;
                        let changed = match from {
                            SubscriptionStatus::CancelPending => sub.finalize_cancellation(now)?,
                            SubscriptionStatus::PastDue => sub.expire_grace(now, grace_days)?,
                            _ => false,
                        };
                        Ok(if changed {
                            SubscriptionChange::Applied { from }
                        } else {
                            SubscriptionChange::Unchanged
                        })
                    }),
                )
                .await;

            match result {
                Ok((sub, SubscriptionChange::Applied { from })) => {
                    if from == SubscriptionStatus::CancelPending {
                        report.finalized += 1;
                    } else {
                        report.expired += 1;
                    }
                    envelopes.extend(notify::envelope(
                        &SubscriptionStatusChanged {
                            event_id: EventId::new(),
                            tenant_id: sub.tenant_id,
                            subscription_id: sub.id,
                            from,
                            to: sub.status,
                            occurred_at: now,
                        },
                        sub.tenant_id,
                    ));
                }
                Ok(_) => {}
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        subscription_id = %candidate.id,
                        error = %err,
                        "Subscription sweep failed"
                    );
                }
            }
        }

        notify::publish(self.events.as_ref(), envelopes).await;
        if report.finalized + report.expired + report.failed > 0 {
            tracing::info!(
                finalized = report.finalized,
                expired = report.expired,
                failed = report.failed,
                "Subscription sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::Harness;
    use crate::domain::subscription::test_support::active_for_30_days;
    use crate::domain::subscription::ProductSubscription;

    async fn store(h: &Harness, sub: &ProductSubscription) {
        SubscriptionRepository::create(h.store.as_ref(), sub).await.unwrap();
    }

    async fn status(h: &Harness, sub: &ProductSubscription) -> SubscriptionStatus {
        SubscriptionRepository::find_by_id(h.store.as_ref(), sub.tenant_id, sub.id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn closes_lapsed_and_keeps_current_subscriptions() {
        let h = Harness::new().await;
        let start = Timestamp::now().add_days(-40);

        let mut lapsed = active_for_30_days(start);
        lapsed.cancel(true, start.add_days(5)).unwrap();
        store(&h, &lapsed).await;

        let mut running = active_for_30_days(Timestamp::now());
        running.cancel(true, Timestamp::now()).unwrap();
        store(&h, &running).await;

        let mut overdue = active_for_30_days(start);
        overdue.mark_past_due(start.add_days(30)).unwrap();
        store(&h, &overdue).await;

        let mut recent = active_for_30_days(start);
        recent.mark_past_due(Timestamp::now().add_days(-1)).unwrap();
        store(&h, &recent).await;

        let report = SweepSubscriptionsHandler::new(h.store.clone(), h.events.clone(), 7)
            .handle(Timestamp::now())
            .await
            .unwrap();

        assert_eq!(report, SweepReport { finalized: 1, expired: 1, failed: 0 });
        assert_eq!(status(&h, &lapsed).await, SubscriptionStatus::Canceled);
        assert_eq!(status(&h, &running).await, SubscriptionStatus::CancelPending);
        assert_eq!(status(&h, &overdue).await, SubscriptionStatus::Canceled);
        assert_eq!(status(&h, &recent).await, SubscriptionStatus::PastDue);
        assert_eq!(h.events.events_of_type("subscription.status_changed.v1").len(), 2);
    }

    #[tokio::test]
    async fn second_sweep_finds_nothing_to_do() {
        let h = Harness::new().await;
        let start = Timestamp::now().add_days(-40);
        let mut lapsed = active_for_30_days(start);
        lapsed.cancel(true, start).unwrap();
        store(&h, &lapsed).await;
        let handler = SweepSubscriptionsHandler::new(h.store.clone(), h.events.clone(), 7);

        handler.handle(Timestamp::now()).await.unwrap();
        let report = handler.handle(Timestamp::now()).await.unwrap();

        assert_eq!(report, SweepReport::default());
    }
}
