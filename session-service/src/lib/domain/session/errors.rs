use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for Role parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0} (expected student, clearingOfficer or admin)")]
    Unknown(String),
}

/// Error for registration profile and password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Name must contain only letters and spaces: {0}")]
    InvalidName(String),

    #[error("Student ID must be in the format 00-0000: {0}")]
    InvalidStudentId(String),

    #[error("Invalid phone number format: {0}")]
    InvalidPhoneNumber(String),

    #[error("Password {0}")]
    WeakPassword(String),
}

/// Top-level error for all session operations.
///
/// `TokenMismatch` is kept distinct from `InvalidToken` for logging and tests;
/// the HTTP layer answers both identically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User with this email already exists")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Refresh token does not match the current session")]
    TokenMismatch,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("User not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for failures the caller cannot fix, which must be logged and
    /// hidden behind a generic message.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Database(_) | AuthError::Internal(_))
    }
}

impl From<UserIdError> for AuthError {
    fn from(err: UserIdError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<RoleError> for AuthError {
    fn from(err: RoleError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::InvalidToken => AuthError::InvalidToken,
            other => AuthError::Internal(other.to_string()),
        }
    }
}
