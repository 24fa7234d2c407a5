//! ListGatewaysHandler - tenant gateway settings with masked secrets.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::gateway::GatewaySetting;
use crate::ports::GatewaySettingRepository;

pub struct ListGatewaysHandler {
    settings: Arc<dyn GatewaySettingRepository>,
}

impl ListGatewaysHandler {
    pub fn new(settings: Arc<dyn GatewaySettingRepository>) -> Self {
        Self { settings }
    }

    pub async fn handle(&self, tenant_id: TenantId) -> Result<Vec<GatewaySetting>, DomainError> {
        self.settings.list(tenant_id).await
    }
}
