//! Reconciliation module - turning verified processor callbacks into
//! order, transaction, and subscription state.

mod errors;
mod gateway_event;
mod reconcile;
mod signature;

pub use errors::WebhookError;
pub use gateway_event::{GatewayEvent, GatewayOutcome};
pub use reconcile::{
    reconcile, PaymentRecord, ReconcileEffect, ReconcileOutcome, ReconcilePolicy,
};
pub use signature::{
    sign_body, sign_timestamped, verify_body, verify_timestamped, SignatureHeader,
    DEFAULT_TOLERANCE_SECS,
};
