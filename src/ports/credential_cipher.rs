//! CredentialCipher port - at-rest encryption of gateway secrets.

use secrecy::SecretString;

use crate::domain::foundation::DomainError;

pub trait CredentialCipher: Send + Sync {
    /// Returns an opaque, storable ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String, DomainError>;

    fn decrypt(&self, ciphertext: &str) -> Result<SecretString, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn CredentialCipher) {}
}
