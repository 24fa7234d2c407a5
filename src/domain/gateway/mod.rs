//! Gateway module - processor configuration and the canonical charge contract.

mod canonical;
mod errors;
mod setting;

pub use canonical::{CanonicalPayment, CanonicalResult, PaymentLink};
pub use errors::{GatewayError, GatewayErrorCode};
pub use setting::{
    apply_default, mask_secret, GatewayCredentials, GatewayKind, GatewayMode, GatewaySetting,
    SecretField,
};

#[cfg(test)]
pub(crate) use setting::test_support;
