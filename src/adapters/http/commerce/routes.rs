//! Axum router configuration for the commerce API.

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::gateways::{configure_gateway, list_gateways, set_default_gateway};
use super::orders::{checkout, create_payment, get_order, refund_order, retry_payment};
use super::state::CommerceAppState;
use super::subscriptions::{cancel, change_plan, pause, proration, renew, resume, start_trial};
use super::webhooks::{handle_gateway_webhook, health};

/// Buyer-facing and administrative routes, mounted under `/api`.
///
/// # Routes
///
/// ## Buyer Endpoints (`X-Tenant-Id` + `X-User-Id`)
/// - `POST /checkout`
/// - `GET /orders/:id`
/// - `POST /orders/:id/payments`, `POST /orders/:id/payments/retry`
/// - `POST /orders/:id/refund`
/// - `POST /subscriptions/trial`
/// - `POST /subscriptions/:id/{pause,resume,cancel,change-plan}`
/// - `GET /subscriptions/:id/proration`
///
/// ## Admin Endpoints (`X-Tenant-Id`)
/// - `POST /subscriptions/:id/renew`
/// - `GET /gateways`, `PUT /gateways/:code`, `POST /gateways/:code/default`
pub fn api_routes() -> Router<CommerceAppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/payments", post(create_payment))
        .route("/orders/:id/payments/retry", post(retry_payment))
        .route("/orders/:id/refund", post(refund_order))
        .route("/subscriptions/trial", post(start_trial))
        .route("/subscriptions/:id/renew", post(renew))
        .route("/subscriptions/:id/pause", post(pause))
        .route("/subscriptions/:id/resume", post(resume))
        .route("/subscriptions/:id/cancel", post(cancel))
        .route("/subscriptions/:id/change-plan", post(change_plan))
        .route("/subscriptions/:id/proration", get(proration))
        .route("/gateways", get(list_gateways))
        .route("/gateways/:code", put(configure_gateway))
        .route("/gateways/:code/default", post(set_default_gateway))
}

/// Webhook routes; authenticated by signature, not headers.
pub fn webhook_routes() -> Router<CommerceAppState> {
    Router::new().route("/:tenant_id/:gateway_code", post(handle_gateway_webhook))
}

/// Complete application with tracing, timeout, and CORS layers.
pub fn commerce_app(state: CommerceAppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
