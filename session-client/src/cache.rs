use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::ClientError;

/// What survives a restart: the access token and the role marker.
///
/// The refresh token is never part of it; it only lives in the cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub access_token: Option<String>,
    pub role: Option<String>,
}

/// Durable storage for [`CachedSession`].
pub trait TokenCache: Send + Sync + 'static {
    fn load(&self) -> Result<CachedSession, ClientError>;
    fn store(&self, session: &CachedSession) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    session: Mutex<CachedSession>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: CachedSession) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl TokenCache for MemoryTokenCache {
    fn load(&self) -> Result<CachedSession, ClientError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, session: &CachedSession) -> Result<(), ClientError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = CachedSession::default();
        Ok(())
    }
}

/// JSON file cache. A missing file reads as an empty session.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Result<CachedSession, ClientError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| ClientError::Cache(e.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CachedSession::default()),
            Err(e) => Err(ClientError::Cache(e.to_string())),
        }
    }

    fn store(&self, session: &CachedSession) -> Result<(), ClientError> {
        let bytes = serde_json::to_vec(session).map_err(|e| ClientError::Cache(e.to_string()))?;
        fs::write(&self.path, bytes).map_err(|e| ClientError::Cache(e.to_string()))
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Cache(e.to_string())),
        }
    }
}
