use async_trait::async_trait;

use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::IssuedSession;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::RotatedSession;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;
use crate::session::errors::AuthError;

/// Port for session lifecycle operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new user and open their session.
    ///
    /// # Arguments
    /// * `command` - Validated email, password, role and profile
    ///
    /// # Returns
    /// Created user with a fresh access and refresh token
    ///
    /// # Errors
    /// * `DuplicateUser` - Email is already registered (case-insensitive)
    /// * `Database` / `Internal` - Storage or crypto failure
    async fn register(&self, command: RegisterCommand) -> Result<IssuedSession, AuthError>;

    /// Verify credentials and open a new session, replacing any previous one.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `Database` / `Internal` - Storage or crypto failure
    async fn login(&self, command: LoginCommand) -> Result<IssuedSession, AuthError>;

    /// Exchange the current refresh token for a new access token, rotating the
    /// refresh token.
    ///
    /// # Arguments
    /// * `presented` - Refresh token sent by the client, if any
    ///
    /// # Errors
    /// * `MissingToken` - No token presented
    /// * `InvalidToken` - Signature or expiry check failed
    /// * `TokenMismatch` - Token is not the user's current refresh token
    ///   (rotated out, logged out, or lost a concurrent refresh)
    async fn refresh(&self, presented: Option<&str>) -> Result<RotatedSession, AuthError>;

    /// Close the user's session. Idempotent.
    ///
    /// # Errors
    /// * `Database` - Storage failure
    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError>;

    /// Retrieve user by unique identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    async fn get_user(&self, user_id: &UserId) -> Result<User, AuthError>;
}

/// Persistence operations for users and their session slot.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `DuplicateUser` - Email is already registered
    /// * `Database` - Database operation failed
    async fn create(&self, user: User) -> Result<User, AuthError>;

    /// Retrieve user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Retrieve user by normalized email address.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError>;

    /// Overwrite the user's refresh token unconditionally.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Database` - Database operation failed
    async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError>;

    /// Empty the user's session slot.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Database` - Database operation failed
    async fn clear_refresh_token(&self, id: &UserId) -> Result<(), AuthError>;

    /// Atomically replace the user's refresh token only if it still equals
    /// `expected`.
    ///
    /// # Returns
    /// True if the swap happened, false if the stored value differed
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn swap_refresh_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AuthError>;
}
