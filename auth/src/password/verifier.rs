use std::sync::OnceLock;

use super::argon2::Argon2Hasher;
use super::errors::PasswordError;
use super::PasswordHasher;

/// Checks plaintext passwords against stored hashes.
///
/// Thin wrapper over a [`PasswordHasher`] so callers never compare password
/// material themselves.
pub struct CredentialVerifier<H: PasswordHasher = Argon2Hasher> {
    hasher: H,
    decoy_hash: OnceLock<Option<String>>,
}

const DECOY_PASSWORD: &str = "decoy-password-never-assigned";

impl CredentialVerifier<Argon2Hasher> {
    /// Create a verifier backed by Argon2id.
    pub fn argon2() -> Self {
        Self::new(Argon2Hasher::new())
    }
}

impl<H: PasswordHasher> CredentialVerifier<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            decoy_hash: OnceLock::new(),
        }
    }

    /// Hash a password for storage at registration.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        self.hasher.hash(password)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Returns
    /// True if the password matches
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is unreadable
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.hasher.verify(password, stored_hash)
    }

    /// Reject a login for an account that does not exist, paying the same
    /// hash cost as a real verification.
    ///
    /// # Returns
    /// Always false
    pub fn verify_unknown(&self, password: &str) -> bool {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.hasher.hash(DECOY_PASSWORD).ok());

        if let Some(hash) = decoy {
            let _ = self.hasher.verify(password, hash);
        }
        false
    }
}

impl Default for CredentialVerifier<Argon2Hasher> {
    fn default() -> Self {
        Self::argon2()
    }
}
