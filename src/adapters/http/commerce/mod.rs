//! HTTP adapter for the commerce API.
//!
//! - `POST /api/checkout` - Create an order and start its payment
//! - `GET /api/orders/:id` - Order with its attempts
//! - `POST /api/orders/:id/payments[/retry]` - Payment attempts
//! - `POST /api/orders/:id/refund` - Mark refunded
//! - `/api/subscriptions/...` - Trial, renew, pause, resume, cancel, change plan, proration
//! - `/api/gateways/...` - Tenant gateway administration
//! - `POST /webhooks/:tenant_id/:gateway_code` - Processor callbacks
//! - `GET /health` - Liveness

mod dto;
mod error;
mod extract;
mod gateways;
mod orders;
mod routes;
mod state;
mod subscriptions;
mod webhooks;

pub use dto::*;
pub use error::{status_for, ApiError};
pub use extract::{BuyerContext, TenantContext, TENANT_HEADER, USER_HEADER};
pub use routes::{api_routes, commerce_app, webhook_routes};
pub use state::CommerceAppState;
pub use webhooks::WebhookApiError;
