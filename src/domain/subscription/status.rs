//! Subscription status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recurring-billing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial before the first paid period.
    Trial,

    /// Paid and current.
    Active,

    /// Temporarily suspended by the buyer; the paid period is preserved.
    Paused,

    /// Cancellation requested; access continues until the period ends.
    CancelPending,

    /// Ended. Terminal.
    Canceled,

    /// Renewal payment failed; inside the grace window.
    PastDue,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::CancelPending => "cancel_pending",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
        }
    }

    /// Whether the buyer currently has access to subscribed content.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial
                | SubscriptionStatus::Active
                | SubscriptionStatus::CancelPending
                | SubscriptionStatus::PastDue
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIAL
            (Trial, Active)
                | (Trial, CancelPending)
                | (Trial, Canceled)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Paused)
                | (Active, CancelPending)
                | (Active, Canceled)
                | (Active, PastDue)
            // From PAUSED
                | (Paused, Active)
                | (Paused, CancelPending)
                | (Paused, Canceled)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Canceled)
            // From CANCEL_PENDING
                | (CancelPending, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trial => vec![Active, CancelPending, Canceled],
            Active => vec![Active, Paused, CancelPending, Canceled, PastDue],
            Paused => vec![Active, CancelPending, Canceled],
            PastDue => vec![Active, Canceled],
            CancelPending => vec![Canceled],
            Canceled => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancel_pending" => Ok(SubscriptionStatus::CancelPending),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            other => Err(format!("Invalid subscription status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn active_and_paused_toggle() {
        assert!(Active.can_transition_to(&Paused));
        assert!(Paused.can_transition_to(&Active));
    }

    #[test]
    fn past_due_recovers_or_cancels() {
        assert_eq!(PastDue.transition_to(Active), Ok(Active));
        assert_eq!(PastDue.transition_to(Canceled), Ok(Canceled));
        assert!(PastDue.transition_to(Paused).is_err());
    }

    #[test]
    fn trial_cannot_pause_or_fall_past_due() {
        assert!(!Trial.can_transition_to(&Paused));
        assert!(!Trial.can_transition_to(&PastDue));
    }

    #[test]
    fn cancel_pending_only_finalizes() {
        assert_eq!(CancelPending.valid_transitions(), vec![Canceled]);
    }

    #[test]
    fn canceled_is_terminal() {
        assert!(Canceled.is_terminal());
        assert!(!Canceled.has_access());
    }

    #[test]
    fn paused_has_no_access() {
        assert!(!Paused.has_access());
        assert!(CancelPending.has_access());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [Trial, Active, Paused, CancelPending, Canceled, PastDue] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }
}
