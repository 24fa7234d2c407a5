//! API error type that converts domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::application::handlers::PaymentError;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

use super::dto::ErrorResponse;

/// Body message for server-side failures; the real cause is only logged.
pub(super) const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError(DomainError);

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(DomainError::new(ErrorCode::Unauthorized, message))
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorCode::ProductNotEligible => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::OrderNotFound
        | ErrorCode::TransactionNotFound
        | ErrorCode::SubscriptionNotFound
        | ErrorCode::ProductNotFound
        | ErrorCode::GatewayNotConfigured => StatusCode::NOT_FOUND,
        ErrorCode::IllegalOrderTransition
        | ErrorCode::IllegalSubscriptionTransition
        | ErrorCode::RetryLimitExceeded
        | ErrorCode::PaymentInFlight => StatusCode::CONFLICT,
        ErrorCode::GatewayCredentialsInvalid | ErrorCode::GatewayRequestRejected => {
            StatusCode::BAD_GATEWAY
        }
        ErrorCode::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::WebhookSignatureInvalid | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::DatabaseError | ErrorCode::EncryptionError | ErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.code);
        let body = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(code = %self.0.code, error = %self.0.message, "Request failed");
            ErrorResponse::new(self.0.code.to_string(), INTERNAL_MESSAGE)
        } else {
            ErrorResponse::from(self.0)
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_conflicts_map_to_409() {
        for code in [
            ErrorCode::IllegalOrderTransition,
            ErrorCode::IllegalSubscriptionTransition,
            ErrorCode::RetryLimitExceeded,
            ErrorCode::PaymentInFlight,
        ] {
            assert_eq!(status_for(code), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn gateway_failures_map_to_upstream_statuses() {
        assert_eq!(status_for(ErrorCode::GatewayRequestRejected), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorCode::GatewayUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorCode::GatewayNotConfigured), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_message() {
        let response = ApiError::from(DomainError::database("connection refused to 10.0.0.5")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(!bytes.windows(8).any(|w| w == b"10.0.0.5"));
    }

    #[test]
    fn ineligible_product_is_unprocessable() {
        assert_eq!(status_for(ErrorCode::ProductNotEligible), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
