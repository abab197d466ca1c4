use chrono::Duration;

use crate::jwt::AccessClaims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::RefreshClaims;

/// Secrets and lifetimes for the two token classes.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless issuer and verifier of access and refresh tokens.
///
/// Access and refresh tokens are signed with independent secrets so that the
/// compromise of one secret does not compromise the other token class.
pub struct TokenService {
    access: JwtHandler,
    refresh: JwtHandler,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Create a token service from settings.
    ///
    /// # Errors
    /// * `InvalidConfiguration` - A secret is empty, both secrets are equal,
    ///   or a lifetime is not positive
    pub fn new(settings: &TokenSettings) -> Result<Self, JwtError> {
        if settings.access_secret.is_empty() || settings.refresh_secret.is_empty() {
            return Err(JwtError::InvalidConfiguration(
                "token secrets must not be empty".to_string(),
            ));
        }

        if settings.access_secret == settings.refresh_secret {
            return Err(JwtError::InvalidConfiguration(
                "access and refresh secrets must differ".to_string(),
            ));
        }

        if settings.access_ttl <= Duration::zero() || settings.refresh_ttl <= Duration::zero() {
            return Err(JwtError::InvalidConfiguration(
                "token lifetimes must be positive".to_string(),
            ));
        }

        Ok(Self {
            access: JwtHandler::new(settings.access_secret.as_bytes()),
            refresh: JwtHandler::new(settings.refresh_secret.as_bytes()),
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        })
    }

    /// Lifetime applied to access tokens issued by [`TokenService::issue_pair`].
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Lifetime applied to refresh tokens issued by [`TokenService::issue_pair`].
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an access token with the access secret.
    pub fn issue_access_token(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        self.access.encode(claims)
    }

    /// Sign a refresh token with the refresh secret.
    pub fn issue_refresh_token(&self, claims: &RefreshClaims) -> Result<String, JwtError> {
        self.refresh.encode(claims)
    }

    /// Issue a fresh access and refresh token for a user using the configured
    /// lifetimes.
    ///
    /// # Arguments
    /// * `user_id` - Unique user identifier
    /// * `email` - Email stored in the access token
    /// * `role` - Role stored in the access token
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_pair(
        &self,
        user_id: impl ToString,
        email: &str,
        role: &str,
    ) -> Result<TokenPair, JwtError> {
        let user_id = user_id.to_string();

        let access_token = self.issue_access_token(&AccessClaims::for_user(
            &user_id,
            email,
            role,
            self.access_ttl,
        ))?;
        let refresh_token =
            self.issue_refresh_token(&RefreshClaims::for_user(&user_id, self.refresh_ttl))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token signature and expiry.
    ///
    /// # Errors
    /// * `InvalidToken` - Token is forged, malformed, expired or a refresh token
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.access.decode(token)
    }

    /// Verify a refresh token signature and expiry.
    ///
    /// # Errors
    /// * `InvalidToken` - Token is forged, malformed, expired or an access token
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        self.refresh.decode(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TokenSettings {
        TokenSettings {
            access_secret: "access_secret_key_at_least_32_bytes!".to_string(),
            refresh_secret: "refresh_secret_key_at_least_32_bytes".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    #[test]
    fn test_issue_pair_and_verify() {
        let tokens = TokenService::new(&settings()).expect("Failed to build token service");

        let pair = tokens
            .issue_pair("user123", "a@x.com", "student")
            .expect("Failed to issue tokens");

        let access = tokens
            .verify_access(&pair.access_token)
            .expect("Access token validation failed");
        assert_eq!(access.sub, "user123");
        assert_eq!(access.email, "a@x.com");
        assert_eq!(access.role, "student");

        let refresh = tokens
            .verify_refresh(&pair.refresh_token)
            .expect("Refresh token validation failed");
        assert_eq!(refresh.sub, "user123");
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_token_classes_are_not_interchangeable() {
        let tokens = TokenService::new(&settings()).expect("Failed to build token service");
        let pair = tokens
            .issue_pair("user123", "a@x.com", "student")
            .expect("Failed to issue tokens");

        assert_eq!(
            tokens.verify_access(&pair.refresh_token),
            Err(JwtError::InvalidToken)
        );
        assert_eq!(
            tokens.verify_refresh(&pair.access_token),
            Err(JwtError::InvalidToken)
        );
    }

    #[test]
    fn test_consecutive_pairs_differ() {
        let tokens = TokenService::new(&settings()).expect("Failed to build token service");

        let first = tokens
            .issue_pair("user123", "a@x.com", "student")
            .expect("Failed to issue tokens");
        let second = tokens
            .issue_pair("user123", "a@x.com", "student")
            .expect("Failed to issue tokens");

        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_expired_refresh_token_is_invalid() {
        let tokens = TokenService::new(&settings()).expect("Failed to build token service");

        let mut claims = RefreshClaims::for_user("user123", Duration::days(7));
        claims.exp = claims.iat - 5;
        let token = tokens
            .issue_refresh_token(&claims)
            .expect("Failed to issue token");

        assert_eq!(tokens.verify_refresh(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_rejects_shared_secret() {
        let mut settings = settings();
        settings.refresh_secret = settings.access_secret.clone();

        assert!(matches!(
            TokenService::new(&settings),
            Err(JwtError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_empty_secret() {
        let mut settings = settings();
        settings.access_secret = String::new();

        assert!(matches!(
            TokenService::new(&settings),
            Err(JwtError::InvalidConfiguration(_))
        ));
    }
}
