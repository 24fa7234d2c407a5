//! Gateway administration endpoints.

use axum::extract::{Json, Path, State};
use axum::response::IntoResponse;

use crate::application::handlers::{ConfigureGatewayCommand, SetDefaultGatewayCommand};
use crate::domain::foundation::GatewayCode;

use super::dto::ConfigureGatewayRequest;
use super::error::ApiError;
use super::extract::TenantContext;
use super::state::CommerceAppState;

/// GET /api/gateways - Tenant gateways with masked secrets
pub async fn list_gateways(
    State(state): State<CommerceAppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.list_gateways_handler().handle(ctx.tenant_id).await?;
    Ok(Json(settings))
}

/// PUT /api/gateways/:code - Create or update a gateway
pub async fn configure_gateway(
    State(state): State<CommerceAppState>,
    ctx: TenantContext,
    Path(code): Path<String>,
    Json(request): Json<ConfigureGatewayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = ConfigureGatewayCommand {
        tenant_id: ctx.tenant_id,
        code: GatewayCode::new(code)?,
        kind: request.kind,
        mode: request.mode,
        enabled: request.enabled,
        api_key: request.api_key,
        signing_secret: request.signing_secret,
        public_key: request.public_key,
        merchant_id: request.merchant_id,
        api_base_url: request.api_base_url,
    };
    let setting = state.configure_gateway_handler().handle(cmd).await?;
    Ok(Json(setting))
}

/// POST /api/gateways/:code/default - Make a gateway the tenant default
pub async fn set_default_gateway(
    State(state): State<CommerceAppState>,
    ctx: TenantContext,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let setting = state
        .set_default_gateway_handler()
        .handle(SetDefaultGatewayCommand {
            tenant_id: ctx.tenant_id,
            code: GatewayCode::new(code)?,
        })
        .await?;
    Ok(Json(setting))
}
