pub mod argon2;
pub mod errors;
pub mod verifier;

pub use self::argon2::Argon2Hasher;
pub use errors::PasswordError;
pub use verifier::CredentialVerifier;

/// Password hashing primitive.
///
/// Implementations must use a slow, salted one-way hash and compare in
/// constant time.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a plaintext password for storage.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Verify a plaintext password against a stored hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}
