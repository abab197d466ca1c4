use thiserror::Error;

/// Error type for JWT operations.
///
/// Verification failures collapse into a single `InvalidToken` variant: a caller
/// cannot tell a forged token from a malformed or expired one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Invalid token configuration: {0}")]
    InvalidConfiguration(String),
}
