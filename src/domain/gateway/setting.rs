//! Tenant gateway configuration.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{GatewayCode, GatewaySettingId, TenantId, Timestamp};

/// Processor family; decides which adapter implementation is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Card rail with client-side confirmation.
    CardRail,
    /// Processor-hosted checkout page.
    RedirectCheckout,
    /// Mobile-money collection with per-channel deep links.
    MobileMoney,
    /// General shareable payment link.
    PaymentLink,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::CardRail => "card_rail",
            GatewayKind::RedirectCheckout => "redirect_checkout",
            GatewayKind::MobileMoney => "mobile_money",
            GatewayKind::PaymentLink => "payment_link",
        }
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card_rail" => Ok(GatewayKind::CardRail),
            "redirect_checkout" => Ok(GatewayKind::RedirectCheckout),
            "mobile_money" => Ok(GatewayKind::MobileMoney),
            "payment_link" => Ok(GatewayKind::PaymentLink),
            other => Err(format!("Invalid gateway kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    #[default]
    Sandbox,
    Live,
}

impl GatewayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayMode::Sandbox => "sandbox",
            GatewayMode::Live => "live",
        }
    }
}

impl FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(GatewayMode::Sandbox),
            "live" => Ok(GatewayMode::Live),
            other => Err(format!("Invalid gateway mode: {}", other)),
        }
    }
}

/// Masks all but the last four characters of a secret.
///
/// Secrets of four characters or fewer are masked entirely. The mask has a
/// fixed width so it does not reveal the secret's length.
pub fn mask_secret(secret: &str) -> String {
    const MASK: &str = "••••••••";
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return MASK.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", MASK, tail)
}

/// An encrypted secret plus the mask shown to administrators.
///
/// Serializes as the mask only. The ciphertext never leaves the persistence
/// layer and the plaintext only exists after the registry decrypts it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretField {
    ciphertext: String,
    masked: String,
}

impl SecretField {
    /// Wraps a ciphertext produced for `plaintext`.
    pub fn new(ciphertext: String, plaintext: &str) -> Self {
        Self {
            ciphertext,
            masked: mask_secret(plaintext),
        }
    }

    /// Rebuilds from storage where the mask was persisted alongside the ciphertext.
    pub fn from_parts(ciphertext: String, masked: String) -> Self {
        Self { ciphertext, masked }
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn masked(&self) -> &str {
        &self.masked
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretField({})", self.masked)
    }
}

impl Serialize for SecretField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.masked)
    }
}

/// Stored credentials of one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayCredentials {
    pub api_key: SecretField,
    pub signing_secret: SecretField,
    /// Publishable key handed to browsers; not secret.
    pub public_key: Option<String>,
    pub merchant_id: Option<String>,
}

/// Tenant-scoped processor configuration.
///
/// # Invariants
///
/// - At most one setting per tenant has `is_default = true`
/// - `code` is unique per tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySetting {
    pub id: GatewaySettingId,
    pub tenant_id: TenantId,
    pub code: GatewayCode,
    pub kind: GatewayKind,
    pub mode: GatewayMode,
    pub enabled: bool,
    pub is_default: bool,
    pub credentials: GatewayCredentials,
    /// Overrides the configured processor base URL (self-hosted or regional endpoints).
    pub api_base_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GatewaySetting {
    /// True when the registry may hand out an adapter for this setting.
    pub fn is_usable(&self) -> bool {
        self.enabled
    }
}

/// Makes `code` the only default among `settings`.
///
/// Clears every other flag and sets the one. Returns false, leaving all flags
/// untouched, when `code` is absent or disabled.
pub fn apply_default(settings: &mut [GatewaySetting], code: &GatewayCode, now: Timestamp) -> bool {
    let target_usable = settings
        .iter()
        .any(|setting| &setting.code == code && setting.enabled);
    if !target_usable {
        return false;
    }
    for setting in settings.iter_mut() {
        let should_be_default = &setting.code == code;
        if setting.is_default != should_be_default {
            setting.is_default = should_be_default;
            setting.updated_at = now;
        }
    }
    true
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn setting(tenant_id: TenantId, code: &str, kind: GatewayKind) -> GatewaySetting {
        let now = Timestamp::now();
        GatewaySetting {
            id: GatewaySettingId::new(),
            tenant_id,
            code: GatewayCode::new(code).unwrap(),
            kind,
            mode: GatewayMode::Sandbox,
            enabled: true,
            is_default: false,
            credentials: GatewayCredentials {
                api_key: SecretField::new("enc:sk_test_abcdef1234".to_string(), "sk_test_abcdef1234"),
                signing_secret: SecretField::new("enc:whsec_secret9876".to_string(), "whsec_secret9876"),
                public_key: Some("pk_test_1".to_string()),
                merchant_id: None,
            },
            api_base_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::setting;
    use super::*;

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask_secret("sk_live_abcdef1234"), "••••••••1234");
        assert_eq!(mask_secret("abcd"), "••••••••");
        assert_eq!(mask_secret(""), "••••••••");
    }

    #[test]
    fn serialized_setting_never_contains_secrets() {
        let s = setting(TenantId::new(), "stripe", GatewayKind::CardRail);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("••••••••1234"));
        assert!(json.contains("••••••••9876"));
        assert!(!json.contains("sk_test_abcdef1234"));
        assert!(!json.contains("enc:"));
    }

    #[test]
    fn debug_output_is_masked() {
        let s = setting(TenantId::new(), "stripe", GatewayKind::CardRail);
        let debug = format!("{:?}", s);
        assert!(!debug.contains("sk_test_abcdef1234"));
    }

    #[test]
    fn apply_default_leaves_exactly_one() {
        let tenant = TenantId::new();
        let mut settings = vec![
            setting(tenant, "stripe", GatewayKind::CardRail),
            setting(tenant, "mpesa", GatewayKind::MobileMoney),
            setting(tenant, "paylink", GatewayKind::PaymentLink),
        ];
        settings[0].is_default = true;

        assert!(apply_default(&mut settings, &GatewayCode::new("mpesa").unwrap(), Timestamp::now()));
        let defaults: Vec<_> = settings.iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].code.as_str(), "mpesa");
    }

    #[test]
    fn apply_default_refuses_disabled_or_unknown() {
        let tenant = TenantId::new();
        let mut settings = vec![
            setting(tenant, "stripe", GatewayKind::CardRail),
            setting(tenant, "mpesa", GatewayKind::MobileMoney),
        ];
        settings[0].is_default = true;
        settings[1].enabled = false;

        assert!(!apply_default(&mut settings, &GatewayCode::new("mpesa").unwrap(), Timestamp::now()));
        assert!(!apply_default(&mut settings, &GatewayCode::new("nope").unwrap(), Timestamp::now()));
        assert!(settings[0].is_default);
    }

    #[test]
    fn kind_and_mode_parse() {
        assert_eq!("mobile_money".parse::<GatewayKind>().unwrap(), GatewayKind::MobileMoney);
        assert_eq!("live".parse::<GatewayMode>().unwrap(), GatewayMode::Live);
        assert!("paypal".parse::<GatewayKind>().is_err());
    }
}
