//! Payment coordination errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::gateway::GatewayError;
use crate::domain::order::OrderError;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The processor refused or could not take the charge. The attempt is
    /// recorded as failed and the order stays payable.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Payment attempt limit reached ({attempts} of {max})")]
    RetryLimitExceeded { attempts: u32, max: u32 },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PaymentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::Order(err) => err.code(),
            PaymentError::Gateway(err) => DomainError::from(err.clone()).code,
            PaymentError::RetryLimitExceeded { .. } => ErrorCode::RetryLimitExceeded,
            PaymentError::Domain(err) => err.code,
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Order(inner) => inner.into(),
            PaymentError::Gateway(inner) => inner.into(),
            PaymentError::RetryLimitExceeded { attempts, max } => DomainError::new(
                ErrorCode::RetryLimitExceeded,
                format!("Payment attempt limit reached ({} of {})", attempts, max),
            )
            .with_detail("max_payment_attempts", max.to_string()),
            PaymentError::Domain(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;

    #[test]
    fn codes_follow_the_wrapped_error() {
        assert_eq!(
            PaymentError::from(OrderError::illegal(OrderStatus::Completed, OrderStatus::Processing)).code(),
            ErrorCode::IllegalOrderTransition
        );
        assert_eq!(
            PaymentError::from(GatewayError::unavailable("timeout")).code(),
            ErrorCode::GatewayUnavailable
        );
        assert_eq!(
            PaymentError::RetryLimitExceeded { attempts: 3, max: 3 }.code(),
            ErrorCode::RetryLimitExceeded
        );
    }

    #[test]
    fn retry_limit_converts_with_detail() {
        let err: DomainError = PaymentError::RetryLimitExceeded { attempts: 3, max: 3 }.into();
        assert_eq!(err.code, ErrorCode::RetryLimitExceeded);
        assert_eq!(err.details.get("max_payment_attempts"), Some(&"3".to_string()));
    }
}
