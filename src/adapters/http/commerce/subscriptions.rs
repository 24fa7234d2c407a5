//! Subscription lifecycle endpoints.
//!
//! Buyer routes act on the caller's own subscriptions. Manual renewal
//! confirms an out-of-band payment and is an operator route.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::{
    CalculateProrationQuery, ChangePlanCommand, ManageSubscriptionCommand, StartTrialCommand,
    SubscriptionAction, SubscriptionActor,
};
use crate::domain::foundation::{SubscriptionId, TenantId};

use super::dto::{CancelSubscriptionRequest, ChangePlanRequest, ProrationParams, StartTrialRequest};
use super::error::ApiError;
use super::extract::{BuyerContext, TenantContext};
use super::state::CommerceAppState;

async fn manage(
    state: &CommerceAppState,
    tenant_id: TenantId,
    actor: SubscriptionActor,
    subscription_id: SubscriptionId,
    action: SubscriptionAction,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .manage_subscription_handler()
        .handle(ManageSubscriptionCommand {
            tenant_id,
            subscription_id,
            actor,
            action,
        })
        .await?;
    Ok(Json(subscription))
}

/// POST /api/subscriptions/:id/renew
pub async fn renew(
    State(state): State<CommerceAppState>,
    ctx: TenantContext,
    Path(id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, ApiError> {
    manage(
        &state,
        ctx.tenant_id,
        SubscriptionActor::Operator,
        id,
        SubscriptionAction::Renew,
    )
    .await
}

/// POST /api/subscriptions/:id/pause
pub async fn pause(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, ApiError> {
    manage(&state, ctx.tenant_id, SubscriptionActor::Buyer(ctx.buyer_id), id, SubscriptionAction::Pause).await
}

/// POST /api/subscriptions/:id/resume
pub async fn resume(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, ApiError> {
    manage(&state, ctx.tenant_id, SubscriptionActor::Buyer(ctx.buyer_id), id, SubscriptionAction::Resume).await
}

/// POST /api/subscriptions/:id/cancel - Body optional; defaults to period end
pub async fn cancel(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(id): Path<SubscriptionId>,
    request: Option<Json<CancelSubscriptionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = request.unwrap_or_default();
    manage(
        &state,
        ctx.tenant_id,
        SubscriptionActor::Buyer(ctx.buyer_id),
        id,
        SubscriptionAction::Cancel {
            at_period_end: request.at_period_end,
        },
    )
    .await
}

/// POST /api/subscriptions/:id/change-plan
pub async fn change_plan(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(id): Path<SubscriptionId>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .change_plan_handler()
        .handle(ChangePlanCommand {
            tenant_id: ctx.tenant_id,
            subscription_id: id,
            actor: SubscriptionActor::Buyer(ctx.buyer_id),
            plan_id: request.plan_id,
            cycle: request.cycle,
        })
        .await?;
    Ok(Json(result))
}

/// GET /api/subscriptions/:id/proration?plan_id=&cycle=
pub async fn proration(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(id): Path<SubscriptionId>,
    Query(params): Query<ProrationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let proration = state
        .proration_handler()
        .handle(CalculateProrationQuery {
            tenant_id: ctx.tenant_id,
            subscription_id: id,
            actor: SubscriptionActor::Buyer(ctx.buyer_id),
            plan_id: params.plan_id,
            cycle: params.cycle,
        })
        .await?;
    Ok(Json(proration))
}

/// POST /api/subscriptions/trial
pub async fn start_trial(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Json(request): Json<StartTrialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .start_trial_handler()
        .handle(StartTrialCommand {
            tenant_id: ctx.tenant_id,
            buyer_id: ctx.buyer_id,
            product_id: request.product_id,
            cycle: request.cycle,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}
