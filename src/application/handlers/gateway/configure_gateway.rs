//! ConfigureGatewayHandler - creates or updates a tenant gateway.
//!
//! Secrets are encrypted before they reach the repository. Omitted secrets
//! keep their stored ciphertext, so administrators can toggle a gateway or
//! switch its mode without re-entering credentials.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{
    DomainError, GatewayCode, GatewaySettingId, TenantId, Timestamp, ValidationError,
};
use crate::domain::gateway::{
    GatewayCredentials, GatewayKind, GatewayMode, GatewaySetting, SecretField,
};
use crate::ports::{CredentialCipher, GatewaySettingRepository};

#[derive(Debug, Clone)]
pub struct ConfigureGatewayCommand {
    pub tenant_id: TenantId,
    pub code: GatewayCode,
    pub kind: GatewayKind,
    pub mode: GatewayMode,
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub signing_secret: Option<SecretString>,
    pub public_key: Option<String>,
    pub merchant_id: Option<String>,
    pub api_base_url: Option<String>,
}

pub struct ConfigureGatewayHandler {
    settings: Arc<dyn GatewaySettingRepository>,
    cipher: Arc<dyn CredentialCipher>,
}

impl ConfigureGatewayHandler {
    pub fn new(settings: Arc<dyn GatewaySettingRepository>, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { settings, cipher }
    }

    /// Returns the stored setting with masked secrets.
    ///
    /// The tenant's first enabled gateway becomes its default.
    pub async fn handle(&self, cmd: ConfigureGatewayCommand) -> Result<GatewaySetting, DomainError> {
        if let Some(url) = &cmd.api_base_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ValidationError::invalid_format("api_base_url", "must be an http(s) URL").into());
            }
        }

        let existing = self.settings.find(cmd.tenant_id, &cmd.code).await?;
        let stored = existing.as_ref().map(|s| &s.credentials);

        let api_key = self.secret_field(
            "api_key",
            cmd.api_key.as_ref(),
            stored.map(|c| &c.api_key),
        )?;
        let signing_secret = self.secret_field(
            "signing_secret",
            cmd.signing_secret.as_ref(),
            stored.map(|c| &c.signing_secret),
        )?;

        let now = Timestamp::now();
        let setting = GatewaySetting {
            id: existing.as_ref().map(|s| s.id).unwrap_or_else(GatewaySettingId::new),
            tenant_id: cmd.tenant_id,
            code: cmd.code.clone(),
            kind: cmd.kind,
            mode: cmd.mode,
            enabled: cmd.enabled,
            is_default: false,
            credentials: GatewayCredentials {
                api_key,
                signing_secret,
                public_key: cmd.public_key,
                merchant_id: cmd.merchant_id,
            },
            api_base_url: cmd.api_base_url,
            created_at: existing.as_ref().map(|s| s.created_at).unwrap_or(now),
            updated_at: now,
        };
        let mut saved = self.settings.upsert(&setting).await?;

        if saved.enabled && !saved.is_default && self.settings.find_default(cmd.tenant_id).await?.is_none() {
            saved = self.settings.set_default(cmd.tenant_id, &cmd.code, now).await?;
        }

        tracing::info!(
            tenant_id = %saved.tenant_id,
            gateway_code = %saved.code,
            kind = %saved.kind,
            mode = saved.mode.as_str(),
            enabled = saved.enabled,
            is_default = saved.is_default,
            "Gateway configured"
        );
        Ok(saved)
    }

    fn secret_field(
        &self,
        field: &'static str,
        provided: Option<&SecretString>,
        stored: Option<&SecretField>,
    ) -> Result<SecretField, DomainError> {
        match (provided, stored) {
            (Some(secret), _) => {
                let plaintext = secret.expose_secret();
                if plaintext.trim().is_empty() {
                    return Err(ValidationError::empty_field(field).into());
                }
                Ok(SecretField::new(self.cipher.encrypt(plaintext)?, plaintext))
            }
            (None, Some(stored)) => Ok(stored.clone()),
            (None, None) => Err(ValidationError::empty_field(field).into()),
        }
    }
}
