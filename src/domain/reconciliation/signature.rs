//! Webhook signature verification.
//!
//! Two schemes are in use across the supported processor families:
//!
//! - **Timestamped**: header `t=<unix>,v1=<hex>` where the MAC covers
//!   `"{t}.{body}"`. The timestamp bounds replay.
//! - **Body**: header `<hex>` (optionally `sha256=<hex>`) where the MAC covers
//!   the raw body.
//!
//! Both use HMAC-SHA256 and constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

/// Default maximum age of a timestamped signature.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of a timestamped signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// All `v1` entries; processors send several while rotating secrets.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<signature>[,v1=...]`. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifies a timestamped signature.
///
/// # Verification Steps
///
/// 1. Parse the header
/// 2. Reject timestamps older than `tolerance_secs` or too far in the future
/// 3. Compare every `v1` entry against the expected MAC in constant time
pub fn verify_timestamped(
    secret: &[u8],
    payload: &[u8],
    header: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let header = SignatureHeader::parse(header)?;

    let age = now_unix - header.timestamp;
    if age > tolerance_secs {
        return Err(WebhookError::TimestampOutOfRange);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }

    let expected = timestamped_mac(secret, header.timestamp, payload)?;
    if header
        .v1_signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

/// Verifies a hex HMAC of the raw body.
pub fn verify_body(secret: &[u8], payload: &[u8], header: &str) -> Result<(), WebhookError> {
    let header = header.trim();
    let hex_part = header.strip_prefix("sha256=").unwrap_or(header);
    let provided = hex::decode(hex_part).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if constant_time_compare(&expected, &provided) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

/// Produces a timestamped header value, as a processor would.
pub fn sign_timestamped(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let mac = timestamped_mac(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac)))
}

/// Produces a body-signature header value, as a processor would.
pub fn sign_body(secret: &[u8], payload: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn timestamped_mac(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret_12345";
    const BODY: &[u8] = br#"{"id":"evt_1","reference":"pi_1"}"#;
    const NOW: i64 = 1_700_000_000;

    // ══════════════════════════════════════════════════════════════
    // Header parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_multiple_v1_entries() {
        let header = SignatureHeader::parse("t=123,v1=abcd,v0=ffff,v1=0102").unwrap();
        assert_eq!(header.timestamp, 123);
        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn missing_parts_are_parse_errors() {
        assert!(matches!(
            SignatureHeader::parse("v1=abcd"),
            Err(WebhookError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=1"),
            Err(WebhookError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("garbage"),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamped scheme
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_timestamped_signature() {
        let header = sign_timestamped(SECRET, NOW - 10, BODY).unwrap();
        assert!(verify_timestamped(SECRET, BODY, &header, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign_timestamped(SECRET, NOW, BODY).unwrap();
        let tampered = br#"{"id":"evt_1","reference":"pi_2"}"#;
        assert_eq!(
            verify_timestamped(SECRET, tampered, &header, NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign_timestamped(b"other", NOW, BODY).unwrap();
        assert_eq!(
            verify_timestamped(SECRET, BODY, &header, NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let stale = sign_timestamped(SECRET, NOW - 301, BODY).unwrap();
        assert_eq!(
            verify_timestamped(SECRET, BODY, &stale, NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::TimestampOutOfRange)
        );
        let future = sign_timestamped(SECRET, NOW + 120, BODY).unwrap();
        assert_eq!(
            verify_timestamped(SECRET, BODY, &future, NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Body scheme
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_body_signature_with_or_without_prefix() {
        let sig = sign_body(SECRET, BODY).unwrap();
        assert!(verify_body(SECRET, BODY, &sig).is_ok());
        assert!(verify_body(SECRET, BODY, &format!("sha256={}", sig)).is_ok());
    }

    #[test]
    fn rejects_non_hex_and_mismatched_body_signature() {
        assert_eq!(
            verify_body(SECRET, BODY, "not-hex"),
            Err(WebhookError::InvalidSignature)
        );
        let sig = sign_body(b"other", BODY).unwrap();
        assert_eq!(
            verify_body(SECRET, BODY, &sig),
            Err(WebhookError::InvalidSignature)
        );
    }
}
