//! Subscription-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};

use super::SubscriptionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Subscription not found: {0}")]
    NotFound(SubscriptionId),

    #[error("Cannot {action} a subscription that is {from}")]
    IllegalTransition {
        from: SubscriptionStatus,
        action: &'static str,
    },

    #[error("{0}")]
    PlanNotEligible(String),

    #[error("Only tenant operators may {0} a subscription")]
    OperatorOnly(&'static str),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn illegal(from: SubscriptionStatus, action: &'static str) -> Self {
        SubscriptionError::IllegalTransition { from, action }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::IllegalTransition { .. } => ErrorCode::IllegalSubscriptionTransition,
            SubscriptionError::PlanNotEligible(_) => ErrorCode::ProductNotEligible,
            SubscriptionError::OperatorOnly(_) => ErrorCode::Forbidden,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        SubscriptionError::Infrastructure(err.to_string())
    }
}
