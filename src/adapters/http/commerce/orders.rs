//! Checkout, order, and payment endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::{
    CheckoutCommand, CreateOrderCommand, CreatePaymentCommand, GetOrderQuery, RetryPaymentCommand,
    TransitionOrderCommand,
};
use crate::domain::foundation::OrderId;
use crate::domain::order::OrderStatus;

use super::dto::{CheckoutRequest, PaymentRequest};
use super::error::ApiError;
use super::extract::BuyerContext;
use super::state::CommerceAppState;

/// POST /api/checkout - Create an order and its first payment attempt
pub async fn checkout(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CheckoutCommand {
        order: CreateOrderCommand {
            tenant_id: ctx.tenant_id,
            buyer_id: ctx.buyer_id,
            order_type: request.order_type,
            lines: request.lines,
            billing: request.billing,
            gateway_code: request.gateway_code,
            renews: request.renews,
        },
        client_payload: request.payload,
    };

    let result = state.checkout_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/orders/:id - Order with its attempt history
pub async fn get_order(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .get_order_handler()
        .handle(GetOrderQuery {
            tenant_id: ctx.tenant_id,
            order_id,
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/orders/:id/payments - First attempt for an existing order
pub async fn create_payment(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(order_id): Path<OrderId>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .create_payment_handler()
        .handle(CreatePaymentCommand {
            tenant_id: ctx.tenant_id,
            order_id,
            gateway_code: request.gateway_code,
            client_payload: request.payload,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /api/orders/:id/payments/retry - New attempt after a failed one
pub async fn retry_payment(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(order_id): Path<OrderId>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .retry_payment_handler()
        .handle(RetryPaymentCommand {
            tenant_id: ctx.tenant_id,
            order_id,
            gateway_code: request.gateway_code,
            client_payload: request.payload,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /api/orders/:id/refund - Mark a completed order refunded
pub async fn refund_order(
    State(state): State<CommerceAppState>,
    ctx: BuyerContext,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .transition_order_handler()
        .handle(TransitionOrderCommand {
            tenant_id: ctx.tenant_id,
            order_id,
            to: OrderStatus::Refunded,
        })
        .await?;
    Ok(Json(order))
}
