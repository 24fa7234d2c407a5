//! SetDefaultGatewayHandler - makes one gateway the tenant default.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, GatewayCode, TenantId, Timestamp};
use crate::domain::gateway::GatewaySetting;
use crate::ports::GatewaySettingRepository;

#[derive(Debug, Clone)]
pub struct SetDefaultGatewayCommand {
    pub tenant_id: TenantId,
    pub code: GatewayCode,
}

pub struct SetDefaultGatewayHandler {
    settings: Arc<dyn GatewaySettingRepository>,
}

impl SetDefaultGatewayHandler {
    pub fn new(settings: Arc<dyn GatewaySettingRepository>) -> Self {
        Self { settings }
    }

    pub async fn handle(&self, cmd: SetDefaultGatewayCommand) -> Result<GatewaySetting, DomainError> {
        let setting = self
            .settings
            .set_default(cmd.tenant_id, &cmd.code, Timestamp::now())
            .await?;
        tracing::info!(
            tenant_id = %cmd.tenant_id,
            gateway_code = %cmd.code,
            "Default gateway changed"
        );
        Ok(setting)
    }
}
