//! Processor webhook endpoint and liveness check.
//!
//! Webhooks carry no tenant headers; the tenant and gateway come from the
//! path the tenant registered with its processor.

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::HandleGatewayWebhookCommand;
use crate::domain::foundation::{GatewayCode, TenantId};
use crate::domain::reconciliation::WebhookError;

use super::dto::{ErrorResponse, HealthResponse};
use super::error::INTERNAL_MESSAGE;
use super::state::CommerceAppState;

/// POST /webhooks/:tenant_id/:gateway_code
pub async fn handle_gateway_webhook(
    State(state): State<CommerceAppState>,
    Path((tenant_id, gateway_code)): Path<(TenantId, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let gateway_code =
        GatewayCode::new(gateway_code).map_err(|_| WebhookError::GatewayNotConfigured("invalid code".into()))?;

    let cmd = HandleGatewayWebhookCommand {
        tenant_id,
        gateway_code,
        payload: body.to_vec(),
        headers,
    };
    let result = state.webhook_handler().handle(cmd).await?;
    Ok((StatusCode::OK, Json(result)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Webhook failures keep their own status mapping; processors retry on 5xx only.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = if status.is_server_error() {
            tracing::error!(code = %self.0.code(), error = %self.0, "Webhook processing failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
