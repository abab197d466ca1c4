//! Token and credential primitives for the session service.
//!
//! Provides:
//! - Password hashing (Argon2id) behind the [`PasswordHasher`] trait
//! - Credential verification ([`CredentialVerifier`])
//! - Access and refresh token issuance with independent secrets ([`TokenService`])
//!
//! # Examples
//!
//! ## Credentials
//! ```
//! use auth::CredentialVerifier;
//!
//! let verifier = CredentialVerifier::argon2();
//! let hash = verifier.hash("Abc12345!").unwrap();
//! assert!(verifier.verify("Abc12345!", &hash).unwrap());
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{TokenService, TokenSettings};
//! use chrono::Duration;
//!
//! let tokens = TokenService::new(&TokenSettings {
//!     access_secret: "access_secret_key_at_least_32_bytes!".to_string(),
//!     refresh_secret: "refresh_secret_key_at_least_32_bytes".to_string(),
//!     access_ttl: Duration::minutes(15),
//!     refresh_ttl: Duration::days(7),
//! })
//! .unwrap();
//!
//! let pair = tokens.issue_pair("user123", "a@x.com", "student").unwrap();
//! let claims = tokens.verify_access(&pair.access_token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! assert!(tokens.verify_access(&pair.refresh_token).is_err());
//! ```

pub mod jwt;
pub mod password;
pub mod tokens;

// Re-export commonly used items
pub use jwt::AccessClaims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::RefreshClaims;
pub use password::Argon2Hasher;
pub use password::CredentialVerifier;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use tokens::TokenPair;
pub use tokens::TokenService;
pub use tokens::TokenSettings;
