//! Canonical charge results.
//!
//! Every adapter, whatever its processor returns, reduces the response to one
//! of five shapes. Callers branch on the shape, never on the processor.

use serde::{Deserialize, Serialize};

/// A deep link offered by a mobile-money collection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Delivery channel, e.g. `whatsapp`, `sms`, `ussd`, `web`.
    pub channel: String,
    pub url: String,
}

/// The five canonical result kinds, tagged by `payment_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum CanonicalPayment {
    /// Confirm in the browser with the processor's client library.
    ClientSecret {
        client_secret: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        publishable_key: Option<String>,
    },
    /// Processor-hosted checkout page.
    CheckoutUrl { checkout_url: String },
    /// Single shareable payment page.
    PaymentUrl { payment_url: String },
    /// Redirect issued after an authorization step.
    RedirectUrl { redirect_url: String },
    /// One link per messaging channel.
    PaymentLinks { payment_links: Vec<PaymentLink> },
}

impl CanonicalPayment {
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalPayment::ClientSecret { .. } => "client_secret",
            CanonicalPayment::CheckoutUrl { .. } => "checkout_url",
            CanonicalPayment::PaymentUrl { .. } => "payment_url",
            CanonicalPayment::RedirectUrl { .. } => "redirect_url",
            CanonicalPayment::PaymentLinks { .. } => "payment_links",
        }
    }
}

/// What a successful `charge` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalResult {
    /// Processor reference that later webhooks will carry.
    pub external_reference: String,
    #[serde(flatten)]
    pub payment: CanonicalPayment,
}

impl CanonicalResult {
    pub fn new(external_reference: impl Into<String>, payment: CanonicalPayment) -> Self {
        Self {
            external_reference: external_reference.into(),
            payment,
        }
    }
}
