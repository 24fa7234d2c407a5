//! Request context extraction.
//!
//! Identity is resolved upstream; this service trusts the `X-Tenant-Id` and
//! `X-User-Id` headers set by the gateway in front of it.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::foundation::{BuyerId, TenantId, ValidationError};

use super::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Tenant scope of an administrative request.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

/// Tenant scope plus the buyer acting in it.
#[derive(Debug, Clone)]
pub struct BuyerContext {
    pub tenant_id: TenantId,
    pub buyer_id: BuyerId,
}

fn tenant_from(parts: &Parts) -> Result<TenantId, ApiError> {
    let raw = parts
        .headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::from(ValidationError::empty_field("X-Tenant-Id")))?;
    raw.trim().parse().map_err(|_| {
        ApiError::from(ValidationError::invalid_format("X-Tenant-Id", "must be a UUID"))
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(TenantContext {
            tenant_id: tenant_from(parts)?,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BuyerContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = tenant_from(parts)?;
        let buyer_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| BuyerId::new(s).ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication is required"))?;
        Ok(BuyerContext { tenant_id, buyer_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn buyer_context_requires_both_headers() {
        let tenant = TenantId::new();
        let mut ok = parts(&[(TENANT_HEADER, &tenant.to_string()), (USER_HEADER, "buyer-1")]);
        let ctx = BuyerContext::from_request_parts(&mut ok, &()).await.unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.buyer_id.as_str(), "buyer-1");

        let mut no_user = parts(&[(TENANT_HEADER, &tenant.to_string())]);
        let err = BuyerContext::from_request_parts(&mut no_user, &()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn malformed_tenant_is_a_validation_error() {
        let mut bad = parts(&[(TENANT_HEADER, "not-a-uuid")]);
        let err = TenantContext::from_request_parts(&mut bad, &()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }
}
