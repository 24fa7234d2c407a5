//! Webhook error types.
//!
//! Each error maps to the HTTP status returned to the processor, which in
//! turn decides whether the processor retries delivery.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature missing or not produced with the gateway's signing secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No transaction carries the event's external reference.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    /// The route names a gateway the tenant has not configured.
    #[error("Gateway not configured: {0}")]
    GatewayNotConfigured(String),

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True when the processor should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// True for failures that may indicate forged or replayed deliveries.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => ErrorCode::WebhookSignatureInvalid,
            WebhookError::ParseError(_) | WebhookError::MissingField(_) | WebhookError::Ignored(_) => {
                ErrorCode::ValidationFailed
            }
            WebhookError::UnknownTransaction(_) => ErrorCode::TransactionNotFound,
            WebhookError::GatewayNotConfigured(_) => ErrorCode::GatewayNotConfigured,
            WebhookError::Database(_) => ErrorCode::DatabaseError,
        }
    }

    /// Status codes drive processor retries:
    /// 2xx acknowledges, 4xx stops, 5xx retries.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,
            WebhookError::GatewayNotConfigured(_) => StatusCode::NOT_FOUND,
            WebhookError::UnknownTransaction(_) | WebhookError::Ignored(_) => StatusCode::OK,
            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_unauthorized_and_final() {
        let err = WebhookError::InvalidSignature;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(!err.is_retryable());
        assert!(err.is_security_relevant());
        assert_eq!(err.code(), ErrorCode::WebhookSignatureInvalid);
    }

    #[test]
    fn unknown_transaction_is_acknowledged() {
        let err = WebhookError::UnknownTransaction("pi_404".to_string());
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(!err.is_security_relevant());
    }

    #[test]
    fn database_errors_ask_for_redelivery() {
        let err = WebhookError::Database("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(format!("{}", err), "Parse error: invalid JSON");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
