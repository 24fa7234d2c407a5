//! PostgreSQL implementation of GatewaySettingRepository.
//!
//! The `gateway_settings_one_default` partial unique index backs the
//! one-default-per-tenant rule; `set_default` clears old flags before
//! setting the new one so the index never sees two.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{db_error, GatewaySettingRow, SETTING_COLUMNS};
use crate::domain::foundation::{DomainError, ErrorCode, GatewayCode, TenantId, Timestamp};
use crate::domain::gateway::{apply_default, GatewaySetting};
use crate::ports::GatewaySettingRepository;

pub struct PostgresGatewaySettingRepository {
    pool: PgPool,
}

impl PostgresGatewaySettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GatewaySettingRepository for PostgresGatewaySettingRepository {
    async fn find(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
    ) -> Result<Option<GatewaySetting>, DomainError> {
        let row: Option<GatewaySettingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM gateway_settings WHERE tenant_id = $1 AND code = $2",
            SETTING_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch gateway setting", e))?;

        row.map(GatewaySetting::try_from).transpose()
    }

    async fn find_default(&self, tenant_id: TenantId) -> Result<Option<GatewaySetting>, DomainError> {
        let row: Option<GatewaySettingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM gateway_settings WHERE tenant_id = $1 AND is_default",
            SETTING_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch default gateway", e))?;

        row.map(GatewaySetting::try_from).transpose()
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<GatewaySetting>, DomainError> {
        let rows: Vec<GatewaySettingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM gateway_settings WHERE tenant_id = $1 ORDER BY code",
            SETTING_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list gateway settings", e))?;

        rows.into_iter().map(GatewaySetting::try_from).collect()
    }

    async fn upsert(&self, setting: &GatewaySetting) -> Result<GatewaySetting, DomainError> {
        let credentials = &setting.credentials;
        let row: GatewaySettingRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO gateway_settings (
                id, tenant_id, code, kind, mode, enabled, is_default,
                api_key_ciphertext, api_key_masked, signing_secret_ciphertext, signing_secret_masked,
                public_key, merchant_id, api_base_url, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (tenant_id, code) DO UPDATE SET
                kind = EXCLUDED.kind,
                mode = EXCLUDED.mode,
                enabled = EXCLUDED.enabled,
                is_default = gateway_settings.is_default AND EXCLUDED.enabled,
                api_key_ciphertext = EXCLUDED.api_key_ciphertext,
                api_key_masked = EXCLUDED.api_key_masked,
                signing_secret_ciphertext = EXCLUDED.signing_secret_ciphertext,
                signing_secret_masked = EXCLUDED.signing_secret_masked,
                public_key = EXCLUDED.public_key,
                merchant_id = EXCLUDED.merchant_id,
                api_base_url = EXCLUDED.api_base_url,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            SETTING_COLUMNS
        ))
        .bind(setting.id.as_uuid())
        .bind(setting.tenant_id.as_uuid())
        .bind(setting.code.as_str())
        .bind(setting.kind.as_str())
        .bind(setting.mode.as_str())
        .bind(setting.enabled)
        .bind(credentials.api_key.ciphertext())
        .bind(credentials.api_key.masked())
        .bind(credentials.signing_secret.ciphertext())
        .bind(credentials.signing_secret.masked())
        .bind(&credentials.public_key)
        .bind(&credentials.merchant_id)
        .bind(&setting.api_base_url)
        .bind(setting.created_at.as_datetime())
        .bind(setting.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert gateway setting", e))?;

        GatewaySetting::try_from(row)
    }

    async fn set_default(
        &self,
        tenant_id: TenantId,
        code: &GatewayCode,
        now: Timestamp,
    ) -> Result<GatewaySetting, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        let rows: Vec<GatewaySettingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM gateway_settings WHERE tenant_id = $1 ORDER BY code FOR UPDATE",
            SETTING_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock gateway settings", e))?;

        let before = rows
            .into_iter()
            .map(GatewaySetting::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let mut after = before.clone();

        if !apply_default(&mut after, code, now) {
            return Err(DomainError::new(
                ErrorCode::GatewayNotConfigured,
                format!("Gateway '{}' is not configured or is disabled", code),
            ));
        }

        // Cleared flags first, then the new default.
        let mut changed: Vec<&GatewaySetting> = after
            .iter()
            .zip(before.iter())
            .filter(|(next, prev)| next.is_default != prev.is_default)
            .map(|(next, _)| next)
            .collect();
        changed.sort_by_key(|setting| setting.is_default);

        for setting in changed {
            sqlx::query("UPDATE gateway_settings SET is_default = $2, updated_at = $3 WHERE id = $1")
                .bind(setting.id.as_uuid())
                .bind(setting.is_default)
                .bind(setting.updated_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to update default gateway", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        after
            .into_iter()
            .find(|setting| setting.is_default)
            .ok_or_else(|| DomainError::new(ErrorCode::InternalError, "default was not applied"))
    }
}
