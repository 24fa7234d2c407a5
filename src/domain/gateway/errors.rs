//! Typed gateway failures.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode};

/// Category of a processor-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Processor rejected our credentials (401/403).
    CredentialsInvalid,
    /// Processor unreachable, timing out, rate-limiting, or failing (5xx).
    ProcessorUnavailable,
    /// Processor understood and refused the request.
    RequestRejected,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::ProcessorUnavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayErrorCode::CredentialsInvalid => "credentials_invalid",
            GatewayErrorCode::ProcessorUnavailable => "processor_unavailable",
            GatewayErrorCode::RequestRejected => "request_rejected",
        }
    }
}

/// A processor failure reduced to one of three categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Processor's own error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn credentials_invalid(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::CredentialsInvalid, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProcessorUnavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::RequestRejected, message)
    }

    /// Maps an HTTP status from the processor to a category.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::credentials_invalid(message),
            429 | 500..=599 => Self::unavailable(message),
            _ => Self::rejected(message),
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::CredentialsInvalid => ErrorCode::GatewayCredentialsInvalid,
            GatewayErrorCode::ProcessorUnavailable => ErrorCode::GatewayUnavailable,
            GatewayErrorCode::RequestRejected => ErrorCode::GatewayRequestRejected,
        };
        let mut domain = DomainError::new(code, err.message.clone());
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}
