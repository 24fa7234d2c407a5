//! Order and transaction status state machines.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a purchase intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created and priced; no accepted payment attempt yet.
    Pending,

    /// A gateway accepted a charge request; awaiting confirmation.
    Processing,

    /// Payment confirmed.
    Completed,

    /// Payment attempts exhausted or declined for good.
    Failed,

    /// Money returned to the buyer after completion.
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Ordered chain of legal edges leading from `self` to `target`, if one exists.
    ///
    /// Used by reconciliation when a confirmation overtakes the acceptance
    /// bookkeeping (pending -> processing -> completed).
    pub fn path_to(&self, target: OrderStatus) -> Option<Vec<OrderStatus>> {
        if *self == target {
            return Some(Vec::new());
        }
        if self.can_transition_to(&target) {
            return Some(vec![target]);
        }
        self.valid_transitions().into_iter().find_map(|next| {
            if next.can_transition_to(&target) {
                Some(vec![next, target])
            } else {
                None
            }
        })
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Processing],
            Processing => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed | Refunded => vec![],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("Invalid order status: {}", other)),
        }
    }
}

/// Lifecycle of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Row written, gateway not yet called (or call outcome not yet recorded).
    Initiated,

    /// Gateway accepted the request; awaiting webhook confirmation.
    Pending,

    Succeeded,

    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Initiated => "initiated",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
        }
    }

    /// True while the attempt may still produce money movement.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransactionStatus::Initiated | TransactionStatus::Pending)
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            (Initiated, Pending)
                | (Initiated, Failed)
                // Webhook confirmation overtook the acceptance write
                | (Initiated, Succeeded)
                | (Pending, Succeeded)
                | (Pending, Failed)
                // Processor recovered the same attempt after reporting a failure
                | (Failed, Succeeded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Initiated => vec![Pending, Failed, Succeeded],
            Pending => vec![Succeeded, Failed],
            Failed => vec![Succeeded],
            Succeeded => vec![],
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(TransactionStatus::Initiated),
            "pending" => Ok(TransactionStatus::Pending),
            "succeeded" => Ok(TransactionStatus::Succeeded),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("Invalid transaction status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORDER: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Failed,
        OrderStatus::Refunded,
    ];

    #[test]
    fn only_documented_order_edges_are_legal() {
        let legal = [
            (OrderStatus::Pending, OrderStatus::Processing),
            (OrderStatus::Processing, OrderStatus::Completed),
            (OrderStatus::Processing, OrderStatus::Failed),
            (OrderStatus::Completed, OrderStatus::Refunded),
        ];
        for from in ALL_ORDER {
            for to in ALL_ORDER {
                assert_eq!(
                    from.can_transition_to(&to),
                    legal.contains(&(from, to)),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn path_to_walks_two_edges() {
        assert_eq!(
            OrderStatus::Pending.path_to(OrderStatus::Completed),
            Some(vec![OrderStatus::Processing, OrderStatus::Completed])
        );
        assert_eq!(OrderStatus::Completed.path_to(OrderStatus::Completed), Some(vec![]));
        assert_eq!(OrderStatus::Failed.path_to(OrderStatus::Completed), None);
    }

    #[test]
    fn order_status_parses_round_trip() {
        for status in ALL_ORDER {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn transaction_terminal_states() {
        assert!(TransactionStatus::Succeeded.is_terminal());
        assert!(!TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Failed.can_transition_to(&TransactionStatus::Pending));
        assert!(TransactionStatus::Initiated.is_in_flight());
        assert!(TransactionStatus::Pending.is_in_flight());
        assert!(!TransactionStatus::Pending.can_transition_to(&TransactionStatus::Initiated));
    }

    #[test]
    fn order_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
