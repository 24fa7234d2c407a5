//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Declares a UUID-backed identifier with the usual constructors and conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Tenant (school / academy) owning every other record.
    TenantId
);
uuid_id!(
    /// Unique identifier for a purchase intent.
    OrderId
);
uuid_id!(
    /// Unique identifier for a single payment attempt.
    TransactionId
);
uuid_id!(
    /// Unique identifier for a recurring-billing relationship.
    SubscriptionId
);
uuid_id!(
    /// Catalog product (course, bundle, or plan).
    ProductId
);
uuid_id!(
    /// Unique identifier for a tenant gateway configuration row.
    GatewaySettingId
);

/// Buyer identifier issued by the identity provider.
///
/// Opaque string; the commerce core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyerId(String);

impl BuyerId {
    /// Creates a BuyerId, rejecting empty or whitespace-only values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("buyer_id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuyerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant-scoped code naming a configured gateway (e.g. `stripe`, `mpesa-ke`).
///
/// Lowercase ASCII letters, digits, `-` and `_`; 1 to 50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GatewayCode(String);

impl GatewayCode {
    pub const MAX_LEN: usize = 50;

    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into().trim().to_ascii_lowercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("gateway_code"));
        }
        if code.len() > Self::MAX_LEN {
            return Err(ValidationError::invalid_format(
                "gateway_code",
                format!("must be at most {} characters", Self::MAX_LEN),
            ));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "gateway_code",
                "only letters, digits, '-' and '_' are allowed",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GatewayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GatewayCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GatewayCode> for String {
    fn from(code: GatewayCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_round_trips_through_string() {
        let id = OrderId::new();
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_are_unique() {
        assert_ne!(TenantId::new(), TenantId::new());
    }

    #[test]
    fn id_rejects_garbage() {
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn buyer_id_rejects_blank() {
        assert!(BuyerId::new("   ").is_err());
        assert_eq!(BuyerId::new("user-1").unwrap().as_str(), "user-1");
    }

    #[test]
    fn gateway_code_is_normalized_to_lowercase() {
        let code = GatewayCode::new("  Stripe ").unwrap();
        assert_eq!(code.as_str(), "stripe");
    }

    #[test]
    fn gateway_code_rejects_invalid_characters() {
        assert!(GatewayCode::new("pay pal").is_err());
        assert!(GatewayCode::new("").is_err());
        assert!(GatewayCode::new("x".repeat(51)).is_err());
    }

    #[test]
    fn gateway_code_deserializes_with_validation() {
        let ok: GatewayCode = serde_json::from_str("\"mpesa-ke\"").unwrap();
        assert_eq!(ok.as_str(), "mpesa-ke");
        assert!(serde_json::from_str::<GatewayCode>("\"bad code\"").is_err());
    }
}
