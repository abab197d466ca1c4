use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::UserStore;
use crate::session::errors::AuthError;

/// Process-local user store for development and tests.
///
/// Every write, including the refresh-token compare-and-swap, happens under a
/// single write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.write().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(AuthError::DuplicateUser);
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        user.refresh_token = Some(token.to_string());
        Ok(())
    }

    async fn clear_refresh_token(&self, id: &UserId) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        user.refresh_token = None;
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AuthError> {
        let mut users = self.users.write().await;

        match users.get_mut(id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(replacement.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
