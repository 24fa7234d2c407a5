//! Gateway setting repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GatewayCode, TenantId, Timestamp};
use crate::domain::gateway::GatewaySetting;

/// Persistence for tenant gateway settings.
///
/// Implementations must ensure at most one default setting per tenant,
/// even under concurrent `set_default` calls.
#[async_trait]
pub trait GatewaySettingRepository: Send + Sync {
    async fn find(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
    ) -> Result<Option<GatewaySetting>, DomainError>;

    async fn find_default(&self, tenant_id: TenantId) -> Result<Option<GatewaySetting>, DomainError>;

    /// All settings for a tenant, ordered by code.
    async fn list(&self, tenant_id: TenantId) -> Result<Vec<GatewaySetting>, DomainError>;

    /// Inserts or replaces the setting for `(tenant_id, code)`.
    ///
    /// The stored `is_default` flag is preserved on update, except that a
    /// disabled setting stops being the default. New settings are never
    /// the default; use `set_default`.
    async fn upsert(&self, setting: &GatewaySetting) -> Result<GatewaySetting, DomainError>;

    /// Clears every default for the tenant, then marks `code`, in one
    /// locked unit of work.
    ///
    /// # Errors
    ///
    /// - `GatewayNotConfigured` if no enabled setting has that code
    async fn set_default(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
        now: Timestamp,
    ) -> Result<GatewaySetting, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn GatewaySettingRepository) {}
}
