//! GatewayRegistry - tenant gateway code to a ready adapter.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, GatewayCode, TenantId};
use crate::domain::gateway::{GatewayKind, GatewayMode, GatewaySetting};
use crate::ports::{
    CredentialCipher, GatewayAdapter, GatewayResolver, GatewaySettingRepository, ResolvedGateway,
};

use super::client::{GatewayClient, ProcessorCredentials, ProcessorEndpoint};
use super::{CardRailAdapter, MobileMoneyAdapter, PaymentLinkAdapter, RedirectCheckoutAdapter};

/// Default processor base URLs for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeUrls {
    pub sandbox: String,
    pub live: String,
}

impl ModeUrls {
    pub fn for_mode(&self, mode: GatewayMode) -> &str {
        match mode {
            GatewayMode::Sandbox => &self.sandbox,
            GatewayMode::Live => &self.live,
        }
    }
}

/// Default base URLs per family, used when a setting has no override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoints {
    pub card_rail: ModeUrls,
    pub redirect_checkout: ModeUrls,
    pub mobile_money: ModeUrls,
    pub payment_link: ModeUrls,
}

impl GatewayEndpoints {
    pub fn base_url(&self, kind: GatewayKind, mode: GatewayMode) -> &str {
        let urls = match kind {
            GatewayKind::CardRail => &self.card_rail,
            GatewayKind::RedirectCheckout => &self.redirect_checkout,
            GatewayKind::MobileMoney => &self.mobile_money,
            GatewayKind::PaymentLink => &self.payment_link,
        };
        urls.for_mode(mode)
    }
}

/// Builds adapters from tenant settings.
///
/// Adapters are constructed per resolution so that credential changes take
/// effect immediately; the HTTP client underneath is shared.
pub struct GatewayRegistry {
    settings: Arc<dyn GatewaySettingRepository>,
    cipher: Arc<dyn CredentialCipher>,
    client: GatewayClient,
    endpoints: GatewayEndpoints,
    webhook_tolerance_secs: i64,
}

impl GatewayRegistry {
    pub fn new(
        settings: Arc<dyn GatewaySettingRepository>,
        cipher: Arc<dyn CredentialCipher>,
        client: GatewayClient,
        endpoints: GatewayEndpoints,
        webhook_tolerance_secs: i64,
    ) -> Self {
        Self {
            settings,
            cipher,
            client,
            endpoints,
            webhook_tolerance_secs,
        }
    }

    fn build_adapter(&self, setting: &GatewaySetting) -> Result<Arc<dyn GatewayAdapter>, DomainError> {
        let credentials = ProcessorCredentials {
            api_key: self.cipher.decrypt(setting.credentials.api_key.ciphertext())?,
            signing_secret: self
                .cipher
                .decrypt(setting.credentials.signing_secret.ciphertext())?,
            public_key: setting.credentials.public_key.clone(),
            merchant_id: setting.credentials.merchant_id.clone(),
        };
        let base_url = setting
            .api_base_url
            .clone()
            .unwrap_or_else(|| self.endpoints.base_url(setting.kind, setting.mode).to_string());
        let endpoint = ProcessorEndpoint {
            base_url,
            mode: setting.mode,
            credentials,
        };
        let client = self.client.clone();

        let adapter: Arc<dyn GatewayAdapter> = match setting.kind {
            GatewayKind::CardRail => Arc::new(CardRailAdapter::new(
                client,
                endpoint,
                self.webhook_tolerance_secs,
            )),
            GatewayKind::RedirectCheckout => Arc::new(RedirectCheckoutAdapter::new(client, endpoint)),
            GatewayKind::MobileMoney => Arc::new(MobileMoneyAdapter::new(client, endpoint)),
            GatewayKind::PaymentLink => Arc::new(PaymentLinkAdapter::new(client, endpoint)),
        };
        Ok(adapter)
    }
}

fn not_configured(code: Option<&GatewayCode>) -> DomainError {
    match code {
        Some(code) => DomainError::new(
            ErrorCode::GatewayNotConfigured,
            format!("Gateway '{}' is not configured or is disabled", code),
        )
        .with_detail("gateway_code", code.as_str()),
        None => DomainError::new(
            ErrorCode::GatewayNotConfigured,
            "No default gateway is configured",
        ),
    }
}

#[async_trait]
impl GatewayResolver for GatewayRegistry {
    async fn resolve(
        &self,
        tenant_id: TenantId,
        code: Option<&GatewayCode>,
    ) -> Result<ResolvedGateway, DomainError> {
        let setting = match code {
            Some(code) => self.settings.find(tenant_id, code).await?,
            None => self.settings.find_default(tenant_id).await?,
        };
        let setting = setting
            .filter(GatewaySetting::is_usable)
            .ok_or_else(|| not_configured(code))?;

        let adapter = self.build_adapter(&setting)?;
        tracing::debug!(
            tenant_id = %tenant_id,
            gateway_code = %setting.code,
            kind = setting.kind.as_str(),
            mode = setting.mode.as_str(),
            "gateway resolved"
        );
        Ok(ResolvedGateway {
            code: setting.code,
            kind: setting.kind,
            adapter,
        })
    }
}
