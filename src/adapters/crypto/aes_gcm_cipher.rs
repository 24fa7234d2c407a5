//! AES-256-GCM implementation of `CredentialCipher`.
//!
//! Stored form is base64 of `nonce || ciphertext`, with a fresh random
//! 96-bit nonce per encryption.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::CredentialCipher;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Builds a cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(key: &SecretString) -> Result<Self, DomainError> {
        let bytes = BASE64
            .decode(key.expose_secret().trim())
            .map_err(|_| encryption_error("credential key is not valid base64"))?;
        if bytes.len() != KEY_LEN {
            return Err(encryption_error(format!(
                "credential key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes)),
        })
    }
}

impl CredentialCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, DomainError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| encryption_error("encryption failed"))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(stored))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<SecretString, DomainError> {
        let stored = BASE64
            .decode(ciphertext)
            .map_err(|_| encryption_error("stored credential is not valid base64"))?;
        if stored.len() <= NONCE_LEN {
            return Err(encryption_error("stored credential is truncated"));
        }
        let (nonce, body) = stored.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| encryption_error("stored credential failed authentication"))?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| encryption_error("stored credential is not UTF-8"))?;
        Ok(SecretString::new(plaintext))
    }
}

fn encryption_error(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::EncryptionError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::new(BASE64.encode([7u8; KEY_LEN]))
    }

    #[test]
    fn decrypts_what_it_encrypts_with_fresh_nonces() {
        let cipher = AesGcmCipher::from_base64_key(&key()).unwrap();
        let a = cipher.encrypt("sk_live_abcdef1234").unwrap();
        let b = cipher.encrypt("sk_live_abcdef1234").unwrap();

        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap().expose_secret(), "sk_live_abcdef1234");
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = AesGcmCipher::from_base64_key(&key()).unwrap();
        let mut raw = BASE64.decode(cipher.encrypt("whsec_1").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        let err = cipher.decrypt(&BASE64.encode(raw)).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncryptionError);
    }

    #[test]
    fn rejects_short_keys() {
        let short = SecretString::new(BASE64.encode([1u8; 16]));
        assert!(AesGcmCipher::from_base64_key(&short).is_err());
    }
}
