use std::sync::PoisonError;
use std::sync::RwLock;

use crate::cache::CachedSession;
use crate::cache::TokenCache;

/// The client's single owned session record.
///
/// The in-memory copy is authoritative; every change is written through to
/// the [`TokenCache`], and a failed write is logged, not returned.
pub struct SessionState {
    current: RwLock<CachedSession>,
    cache: Box<dyn TokenCache>,
}

impl SessionState {
    /// Start from whatever the cache holds. An unreadable cache starts empty.
    pub fn load(cache: impl TokenCache) -> Self {
        let current = cache.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable session cache");
            CachedSession::default()
        });

        Self {
            current: RwLock::new(current),
            cache: Box::new(cache),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn role(&self) -> Option<String> {
        self.read().role.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    pub fn snapshot(&self) -> CachedSession {
        self.read().clone()
    }

    pub fn sign_in(&self, access_token: String, role: String) {
        self.update(|session| {
            session.access_token = Some(access_token);
            session.role = Some(role);
        });
    }

    pub fn set_access_token(&self, access_token: String) {
        self.update(|session| session.access_token = Some(access_token));
    }

    /// Drop the token and the role marker.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = CachedSession::default();

        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, "Failed to clear session cache");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CachedSession> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, change: impl FnOnce(&mut CachedSession)) {
        let snapshot = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut current);
            current.clone()
        };

        if let Err(e) = self.cache.store(&snapshot) {
            tracing::warn!(error = %e, "Failed to persist session cache");
        }
    }
}
