//! Order-specific error types.
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | IllegalTransition | 409 |
//! | ProductNotEligible | 422 |
//! | Validation | 400 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ProductId, ValidationError};

use super::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Illegal order transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Product {product_id} is not eligible: {reason}")]
    ProductNotEligible { product_id: ProductId, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl OrderError {
    pub fn illegal(from: OrderStatus, to: OrderStatus) -> Self {
        OrderError::IllegalTransition { from, to }
    }

    pub fn not_eligible(product_id: ProductId, reason: impl Into<String>) -> Self {
        OrderError::ProductNotEligible {
            product_id,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::NotFound(_) => ErrorCode::OrderNotFound,
            OrderError::IllegalTransition { .. } => ErrorCode::IllegalOrderTransition,
            OrderError::ProductNotEligible { .. } => ErrorCode::ProductNotEligible,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<OrderError> for DomainError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(inner) => inner.into(),
            OrderError::ProductNotEligible { product_id, .. } => {
                DomainError::new(ErrorCode::ProductNotEligible, err.to_string())
                    .with_detail("product_id", product_id.to_string())
            }
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        OrderError::Infrastructure(err.to_string())
    }
}
