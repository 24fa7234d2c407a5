//! Payment configuration

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::gateways::{GatewayEndpoints, ModeUrls};
use crate::application::handlers::PaymentSettings;
use crate::domain::reconciliation::{ReconcilePolicy, DEFAULT_TOLERANCE_SECS};

/// Payment coordination, gateway transport, and commission settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Base64 of the 32-byte AES-256 key for stored gateway secrets
    pub credential_key: SecretString,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    #[serde(default = "default_max_payment_attempts")]
    pub max_payment_attempts: u32,

    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Platform fee in basis points of the order total
    #[serde(default)]
    pub fee_bps: u32,

    /// Tax in basis points of the order total
    #[serde(default)]
    pub tax_bps: u32,

    #[serde(default = "default_return_url")]
    pub return_url_template: String,

    #[serde(default = "default_cancel_url")]
    pub cancel_url_template: String,

    #[serde(default = "default_card_rail_sandbox")]
    pub card_rail_sandbox_url: String,
    #[serde(default = "default_card_rail_live")]
    pub card_rail_live_url: String,
    #[serde(default = "default_redirect_sandbox")]
    pub redirect_checkout_sandbox_url: String,
    #[serde(default = "default_redirect_live")]
    pub redirect_checkout_live_url: String,
    #[serde(default = "default_mobile_money_sandbox")]
    pub mobile_money_sandbox_url: String,
    #[serde(default = "default_mobile_money_live")]
    pub mobile_money_live_url: String,
    #[serde(default = "default_payment_link_sandbox")]
    pub payment_link_sandbox_url: String,
    #[serde(default = "default_payment_link_live")]
    pub payment_link_live_url: String,
}

impl PaymentConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn endpoints(&self) -> GatewayEndpoints {
        GatewayEndpoints {
            card_rail: ModeUrls {
                sandbox: self.card_rail_sandbox_url.clone(),
                live: self.card_rail_live_url.clone(),
            },
            redirect_checkout: ModeUrls {
                sandbox: self.redirect_checkout_sandbox_url.clone(),
                live: self.redirect_checkout_live_url.clone(),
            },
            mobile_money: ModeUrls {
                sandbox: self.mobile_money_sandbox_url.clone(),
                live: self.mobile_money_live_url.clone(),
            },
            payment_link: ModeUrls {
                sandbox: self.payment_link_sandbox_url.clone(),
                live: self.payment_link_live_url.clone(),
            },
        }
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            max_payment_attempts: self.max_payment_attempts,
            return_url_template: self.return_url_template.clone(),
            cancel_url_template: self.cancel_url_template.clone(),
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            max_payment_attempts: self.max_payment_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.credential_key.expose_secret();
        if key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__CREDENTIAL_KEY"));
        }
        match STANDARD.decode(key.trim()) {
            Ok(bytes) if bytes.len() == 32 => {}
            _ => return Err(ValidationError::InvalidCredentialKey),
        }

        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.max_payment_attempts == 0 {
            return Err(ValidationError::InvalidAttemptLimit);
        }
        if self.webhook_tolerance_secs <= 0 || self.webhook_tolerance_secs > 3600 {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.fee_bps + self.tax_bps > 10_000 {
            return Err(ValidationError::InvalidBasisPoints);
        }

        for (name, template) in [
            ("return_url_template", &self.return_url_template),
            ("cancel_url_template", &self.cancel_url_template),
        ] {
            if !is_http_url(template) {
                return Err(ValidationError::InvalidUrlTemplate(name));
            }
        }

        for (name, url) in [
            ("card_rail_sandbox_url", &self.card_rail_sandbox_url),
            ("card_rail_live_url", &self.card_rail_live_url),
            ("redirect_checkout_sandbox_url", &self.redirect_checkout_sandbox_url),
            ("redirect_checkout_live_url", &self.redirect_checkout_live_url),
            ("mobile_money_sandbox_url", &self.mobile_money_sandbox_url),
            ("mobile_money_live_url", &self.mobile_money_live_url),
            ("payment_link_sandbox_url", &self.payment_link_sandbox_url),
            ("payment_link_live_url", &self.payment_link_live_url),
        ] {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidGatewayUrl(name));
            }
        }
        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

fn default_gateway_timeout() -> u64 {
    15
}

fn default_max_payment_attempts() -> u32 {
    3
}

fn default_webhook_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

fn default_return_url() -> String {
    "http://localhost:3000/orders/{order_id}/complete".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/orders/{order_id}/cancel".to_string()
}

fn default_card_rail_sandbox() -> String {
    "https://sandbox.card-rail.example.com".to_string()
}

fn default_card_rail_live() -> String {
    "https://api.card-rail.example.com".to_string()
}

fn default_redirect_sandbox() -> String {
    "https://sandbox.redirect-checkout.example.com".to_string()
}

fn default_redirect_live() -> String {
    "https://api.redirect-checkout.example.com".to_string()
}

fn default_mobile_money_sandbox() -> String {
    "https://sandbox.mobile-money.example.com".to_string()
}

fn default_mobile_money_live() -> String {
    "https://api.mobile-money.example.com".to_string()
}

fn default_payment_link_sandbox() -> String {
    "https://sandbox.payment-link.example.com".to_string()
}

fn default_payment_link_live() -> String {
    "https://api.payment-link.example.com".to_string()
}
