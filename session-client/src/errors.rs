use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error("Session controller has been disposed")]
    Disposed,

    #[error("Token cache error: {0}")]
    Cache(String),
}

/// Why a refresh attempt did not produce an access token.
///
/// Cloned to every caller waiting on the same in-flight refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("Refresh rejected with status {0}")]
    Rejected(u16),

    #[error("Refresh request failed: {0}")]
    Transport(String),

    #[error("Refresh response carried no access token")]
    MalformedResponse,

    #[error("Controller disposed during refresh")]
    Disposed,
}
