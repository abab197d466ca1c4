use std::sync::Arc;

use async_trait::async_trait;
use auth::Argon2Hasher;
use auth::CredentialVerifier;
use auth::PasswordHasher;
use auth::TokenPair;
use auth::TokenService;
use chrono::Utc;

use crate::domain::session::models::IssuedSession;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::RotatedSession;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;
use crate::session::errors::AuthError;
use crate::session::ports::AuthServicePort;
use crate::session::ports::UserStore;

/// Orchestrates register, login, refresh and logout.
///
/// Holds no session state of its own: the user's single session slot is the
/// `refresh_token` field in the [`UserStore`], and rotation is a
/// compare-and-swap on that field.
pub struct AuthSessionManager<S, H = Argon2Hasher>
where
    S: UserStore,
    H: PasswordHasher,
{
    store: Arc<S>,
    tokens: Arc<TokenService>,
    credentials: CredentialVerifier<H>,
}

impl<S> AuthSessionManager<S, Argon2Hasher>
where
    S: UserStore,
{
    /// Create a session manager hashing passwords with Argon2id.
    ///
    /// # Arguments
    /// * `store` - User persistence implementation
    /// * `tokens` - Token issuer shared with the authentication guard
    pub fn new(store: Arc<S>, tokens: Arc<TokenService>) -> Self {
        Self::with_verifier(store, tokens, CredentialVerifier::argon2())
    }
}

impl<S, H> AuthSessionManager<S, H>
where
    S: UserStore,
    H: PasswordHasher,
{
    pub fn with_verifier(
        store: Arc<S>,
        tokens: Arc<TokenService>,
        credentials: CredentialVerifier<H>,
    ) -> Self {
        Self {
            store,
            tokens,
            credentials,
        }
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.tokens
            .issue_pair(user.id, user.email.as_str(), user.role.as_str())
            .map_err(AuthError::from)
    }
}

#[async_trait]
impl<S, H> AuthServicePort for AuthSessionManager<S, H>
where
    S: UserStore,
    H: PasswordHasher,
{
    async fn register(&self, command: RegisterCommand) -> Result<IssuedSession, AuthError> {
        if self.store.find_by_email(&command.email).await?.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = self.credentials.hash(command.password.as_str())?;

        let mut user = User {
            id: UserId::new(),
            email: command.email,
            password_hash,
            role: command.role,
            profile: command.profile,
            refresh_token: None,
            created_at: Utc::now(),
        };

        // The row is created with its first refresh token already in the slot
        let pair = self.issue_pair(&user)?;
        user.refresh_token = Some(pair.refresh_token.clone());

        let user = self.store.create(user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(IssuedSession {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    async fn login(&self, command: LoginCommand) -> Result<IssuedSession, AuthError> {
        let Some(mut user) = self.store.find_by_email(&command.email).await? else {
            self.credentials.verify_unknown(&command.password);
            tracing::info!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .credentials
            .verify(&command.password, &user.password_hash)?
        {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user)?;
        self.store
            .set_refresh_token(&user.id, &pair.refresh_token)
            .await?;
        user.refresh_token = Some(pair.refresh_token.clone());

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(IssuedSession {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    async fn refresh(&self, presented: Option<&str>) -> Result<RotatedSession, AuthError> {
        let presented = presented
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.tokens.verify_refresh(presented).map_err(|_| {
            tracing::warn!("Refresh token failed verification");
            AuthError::InvalidToken
        })?;

        let user_id = UserId::from_string(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let Some(user) = self.store.find_by_id(&user_id).await? else {
            tracing::warn!(user_id = %user_id, "Refresh token for unknown user");
            return Err(AuthError::TokenMismatch);
        };

        if user.refresh_token.as_deref() != Some(presented) {
            tracing::warn!(user_id = %user_id, "Refresh token reuse detected");
            return Err(AuthError::TokenMismatch);
        }

        let pair = self.issue_pair(&user)?;

        if !self
            .store
            .swap_refresh_token(&user_id, presented, &pair.refresh_token)
            .await?
        {
            tracing::warn!(user_id = %user_id, "Refresh token rotated by a concurrent request");
            return Err(AuthError::TokenMismatch);
        }

        tracing::debug!(user_id = %user_id, "Refresh token rotated");

        Ok(RotatedSession {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        match self.store.clear_refresh_token(user_id).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, "User logged out");
                Ok(())
            }
            Err(AuthError::NotFound(_)) => {
                tracing::debug!(user_id = %user_id, "Logout for unknown user");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use auth::TokenSettings;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::domain::session::models::EmailAddress;
    use crate::domain::session::models::NewPassword;
    use crate::domain::session::models::Profile;
    use crate::domain::session::models::Role;
    use crate::outbound::repositories::memory::InMemoryUserStore;

    mock! {
        pub TestUserStore {}

        #[async_trait]
        impl UserStore for TestUserStore {
            async fn create(&self, user: User) -> Result<User, AuthError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError>;
            async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError>;
            async fn clear_refresh_token(&self, id: &UserId) -> Result<(), AuthError>;
            async fn swap_refresh_token(&self, id: &UserId, expected: &str, replacement: &str) -> Result<bool, AuthError>;
        }
    }

    fn token_service() -> Arc<TokenService> {
        Arc::new(
            TokenService::new(&TokenSettings {
                access_secret: "access_secret_key_at_least_32_bytes!".to_string(),
                refresh_secret: "refresh_secret_key_at_least_32_bytes".to_string(),
                access_ttl: Duration::minutes(15),
                refresh_ttl: Duration::days(7),
            })
            .unwrap(),
        )
    }

    fn register_command(email: &str) -> RegisterCommand {
        RegisterCommand {
            email: EmailAddress::new(email).unwrap(),
            password: NewPassword::new("Abc12345!".to_string()).unwrap(),
            role: Role::Student,
            profile: Profile::default(),
        }
    }

    fn login_command(email: &str, password: &str) -> LoginCommand {
        LoginCommand {
            email: EmailAddress::new(email).unwrap(),
            password: password.to_string(),
        }
    }

    fn stored_user(refresh_token: Option<String>) -> User {
        User {
            id: UserId::new(),
            email: EmailAddress::new("a@x.com").unwrap(),
            password_hash: CredentialVerifier::argon2().hash("Abc12345!").unwrap(),
            role: Role::Admin,
            profile: Profile::default(),
            refresh_token,
            created_at: Utc::now(),
        }
    }

    fn memory_manager() -> AuthSessionManager<InMemoryUserStore> {
        AuthSessionManager::new(Arc::new(InMemoryUserStore::new()), token_service())
    }

    #[tokio::test]
    async fn test_register_duplicate_email_skips_create() {
        let mut store = MockTestUserStore::new();
        let existing = stored_user(None);

        store
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        store.expect_create().times(0);

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        let result = manager.register(register_command("A@X.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::DuplicateUser);
    }

    #[tokio::test]
    async fn test_register_persists_first_refresh_token() {
        let mut store = MockTestUserStore::new();

        store.expect_find_by_email().returning(|_| Ok(None));
        store
            .expect_create()
            .withf(|user| {
                user.email.as_str() == "a@x.com"
                    && user.password_hash.starts_with("$argon2")
                    && user.refresh_token.is_some()
            })
            .times(1)
            .returning(|user| Ok(user));

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        let session = manager.register(register_command("a@x.com")).await.unwrap();
        assert_eq!(
            session.user.refresh_token.as_deref(),
            Some(session.refresh_token.as_str())
        );
        assert_ne!(session.access_token, session.refresh_token);
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_invalid_credentials() {
        let mut store = MockTestUserStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));
        store.expect_set_refresh_token().times(0);

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        let result = manager.login(login_command("nobody@x.com", "Abc12345!")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_login_unknown_email_still_verifies_a_hash() {
        struct CountingHasher(Arc<AtomicUsize>);

        impl PasswordHasher for CountingHasher {
            fn hash(&self, password: &str) -> Result<String, auth::PasswordError> {
                Ok(password.to_string())
            }

            fn verify(&self, password: &str, hash: &str) -> Result<bool, auth::PasswordError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(password == hash)
            }
        }

        let mut store = MockTestUserStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let verifications = Arc::new(AtomicUsize::new(0));
        let manager = AuthSessionManager::with_verifier(
            Arc::new(store),
            token_service(),
            CredentialVerifier::new(CountingHasher(Arc::clone(&verifications))),
        );

        let result = manager.login(login_command("nobody@x.com", "Abc12345!")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(verifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_invalid_credentials() {
        let mut store = MockTestUserStore::new();
        let user = stored_user(None);
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        store.expect_set_refresh_token().times(0);

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        let result = manager.login(login_command("a@x.com", "Wrong123!")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_missing_token() {
        let store = MockTestUserStore::new();
        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        assert_eq!(
            manager.refresh(None).await.unwrap_err(),
            AuthError::MissingToken
        );
        assert_eq!(
            manager.refresh(Some("")).await.unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_is_invalid_token() {
        let mut store = MockTestUserStore::new();
        store.expect_find_by_id().times(0);

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        assert_eq!(
            manager.refresh(Some("not.a.token")).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let store = MockTestUserStore::new();
        let tokens = token_service();
        let pair = tokens.issue_pair(UserId::new(), "a@x.com", "admin").unwrap();

        let manager = AuthSessionManager::new(Arc::new(store), tokens);

        assert_eq!(
            manager.refresh(Some(&pair.access_token)).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_refresh_lost_swap_is_token_mismatch() {
        let tokens = token_service();
        let mut user = stored_user(None);
        let pair = tokens
            .issue_pair(user.id, user.email.as_str(), user.role.as_str())
            .unwrap();
        user.refresh_token = Some(pair.refresh_token.clone());

        let mut store = MockTestUserStore::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        store
            .expect_swap_refresh_token()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let manager = AuthSessionManager::new(Arc::new(store), tokens);

        assert_eq!(
            manager.refresh(Some(&pair.refresh_token)).await.unwrap_err(),
            AuthError::TokenMismatch
        );
    }

    #[tokio::test]
    async fn test_logout_unknown_user_succeeds() {
        let mut store = MockTestUserStore::new();
        store
            .expect_clear_refresh_token()
            .times(1)
            .returning(|id| Err(AuthError::NotFound(id.to_string())));

        let manager = AuthSessionManager::new(Arc::new(store), token_service());

        assert!(manager.logout(&UserId::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_claims_match_stored_user() {
        let tokens = token_service();
        let store = Arc::new(InMemoryUserStore::new());
        let manager = AuthSessionManager::new(Arc::clone(&store), Arc::clone(&tokens));

        let mut command = register_command("a@x.com");
        command.role = Role::ClearingOfficer;
        let registered = manager.register(command).await.unwrap();

        let session = manager
            .login(login_command("A@x.COM", "Abc12345!"))
            .await
            .unwrap();

        let claims = tokens.verify_access(&session.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id.to_string());
        assert_eq!(claims.role, "clearingOfficer");
        assert_ne!(session.access_token, registered.access_token);

        let stored = store.find_by_id(&registered.user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(session.refresh_token));
    }

    #[tokio::test]
    async fn test_rotated_out_token_is_rejected() {
        let manager = memory_manager();
        let r1 = manager
            .register(register_command("a@x.com"))
            .await
            .unwrap()
            .refresh_token;

        let rotated = manager.refresh(Some(&r1)).await.unwrap();
        assert_ne!(rotated.refresh_token, r1);

        assert_eq!(
            manager.refresh(Some(&r1)).await.unwrap_err(),
            AuthError::TokenMismatch
        );

        // The legitimate holder is unaffected by the rejected replay
        assert!(manager.refresh(Some(&rotated.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_login_kills_first_session() {
        let manager = memory_manager();
        manager.register(register_command("a@x.com")).await.unwrap();

        let ra = manager
            .login(login_command("a@x.com", "Abc12345!"))
            .await
            .unwrap()
            .refresh_token;
        let rb = manager
            .login(login_command("a@x.com", "Abc12345!"))
            .await
            .unwrap()
            .refresh_token;

        assert_eq!(
            manager.refresh(Some(&ra)).await.unwrap_err(),
            AuthError::TokenMismatch
        );
        assert!(manager.refresh(Some(&rb)).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_and_closes_session() {
        let manager = memory_manager();
        let session = manager.register(register_command("a@x.com")).await.unwrap();

        assert!(manager.logout(&session.user.id).await.is_ok());
        assert!(manager.logout(&session.user.id).await.is_ok());

        assert_eq!(
            manager
                .refresh(Some(&session.refresh_token))
                .await
                .unwrap_err(),
            AuthError::TokenMismatch
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_single_winner() {
        let manager = Arc::new(memory_manager());
        let token = manager
            .register(register_command("a@x.com"))
            .await
            .unwrap()
            .refresh_token;

        let first = {
            let manager = Arc::clone(&manager);
            let token = token.clone();
            tokio::spawn(async move { manager.refresh(Some(&token)).await })
        };
        let second = {
            let manager = Arc::clone(&manager);
            let token = token.clone();
            tokio::spawn(async move { manager.refresh(Some(&token)).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .any(|r| r.as_ref().err() == Some(&AuthError::TokenMismatch)));

        // Only the winner's token is accepted afterwards
        assert!(manager
            .refresh(Some(&winners[0].refresh_token))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let manager = memory_manager();

        assert!(matches!(
            manager.get_user(&UserId::new()).await,
            Err(AuthError::NotFound(_))
        ));
    }
}
