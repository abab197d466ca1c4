use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::cache::TokenCache;
use crate::errors::ClientError;
use crate::errors::RefreshFailure;
use crate::events::SessionEvent;
use crate::state::SessionState;
use crate::transport::ApiRequest;
use crate::transport::ApiResponse;
use crate::transport::Transport;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/auth/logout";

const EVENT_CAPACITY: usize = 16;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// User fields returned by login and register.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Registration payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

struct Inner<T: Transport> {
    transport: T,
    state: SessionState,
    pending_refresh: Mutex<Option<RefreshFuture>>,
    events: broadcast::Sender<SessionEvent>,
    disposed: AtomicBool,
    /// Bumped whenever a session ends, by expiry or logout.
    generation: AtomicU64,
}

impl<T: Transport> Inner<T> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    async fn refresh_access_token(&self) -> Result<String, RefreshFailure> {
        if self.is_disposed() {
            return Err(RefreshFailure::Disposed);
        }

        tracing::debug!("Refreshing access token");
        let response = self
            .transport
            .execute(ApiRequest::post(REFRESH_PATH).json(json!({})))
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        if self.is_disposed() {
            return Err(RefreshFailure::Disposed);
        }
        if !response.status.is_success() {
            return Err(RefreshFailure::Rejected(response.status.as_u16()));
        }
        let token = response
            .access_token()
            .ok_or(RefreshFailure::MalformedResponse)?;

        self.state.set_access_token(token.clone());
        let _ = self.events.send(SessionEvent::Refreshed);
        Ok(token)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// End the session that was current at `seen`. Only the first caller for a
    /// given generation clears the state and signals expiry.
    fn expire(&self, seen: u64, failure: &RefreshFailure) {
        if matches!(failure, RefreshFailure::Disposed) || self.is_disposed() {
            return;
        }
        if self
            .generation
            .compare_exchange(seen, seen + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        tracing::warn!(error = %failure, "Refresh failed, ending session");
        self.state.clear();
        let _ = self.events.send(SessionEvent::expired());
    }
}

/// Client-side half of the session protocol.
///
/// Attaches the cached access token to every request. On a `401` from a
/// protected endpoint it refreshes once through the cookie and replays the
/// request once; concurrent `401`s share a single refresh. A terminal refresh
/// failure clears the session and broadcasts [`SessionEvent::Expired`].
///
/// Dropping the controller disposes it.
pub struct ClientSessionController<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> ClientSessionController<T> {
    pub fn new(transport: T, cache: impl TokenCache) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                transport,
                state: SessionState::load(cache),
                pending_refresh: Mutex::new(None),
                events,
                disposed: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.inner.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Release the controller. Later calls fail with `Disposed` and an
    /// in-flight refresh no longer writes the session state.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner
            .pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::debug!("Session controller disposed");
    }

    fn ensure_active(&self) -> Result<(), ClientError> {
        if self.inner.is_disposed() {
            Err(ClientError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Send a request with the session's access token.
    ///
    /// Non-`401` responses, and any response from the login, register or
    /// refresh endpoints, are returned as they are. A `401` from the replay is
    /// returned too; there is never a second refresh for the same request.
    ///
    /// # Errors
    /// * `SessionExpired` - The refresh after a `401` failed
    /// * `Disposed` - The controller was disposed before or during the call
    /// * `Transport` - The request could not be sent
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.ensure_active()?;

        let generation = self.inner.generation();
        let sent_with = self.inner.state.access_token();
        let response = self
            .inner
            .transport
            .execute(request.clone().with_bearer(sent_with.clone()))
            .await?;
        self.ensure_active()?;

        if response.status != StatusCode::UNAUTHORIZED || is_session_endpoint(&request.path) {
            return Ok(response);
        }

        // Another request may have refreshed while this one was in flight
        let token = match self.inner.state.access_token() {
            Some(current) if sent_with.as_ref() != Some(&current) => current,
            // The session this request was sent under has already ended
            _ if self.inner.generation() != generation => {
                return Err(ClientError::SessionExpired);
            }
            _ => match self.refresh_shared().await {
                Ok(token) => token,
                Err(RefreshFailure::Disposed) => return Err(ClientError::Disposed),
                Err(failure) => {
                    self.inner.expire(generation, &failure);
                    return Err(ClientError::SessionExpired);
                }
            },
        };

        tracing::debug!(path = %request.path, "Replaying request with refreshed token");
        let replay = self
            .inner
            .transport
            .execute(request.with_bearer(Some(token)))
            .await?;
        self.ensure_active()?;

        Ok(replay)
    }

    /// Join the in-flight refresh or start one.
    ///
    /// Each caller decides what a failure means for it; the refresh itself
    /// never ends the session.
    async fn refresh_shared(&self) -> Result<String, RefreshFailure> {
        let refresh = {
            let mut pending = self
                .inner
                .pending_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match pending.as_ref() {
                Some(refresh) => refresh.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let refresh = async move {
                        let result = inner.refresh_access_token().await;
                        inner
                            .pending_refresh
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .take();
                        result
                    }
                    .boxed()
                    .shared();

                    *pending = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Try to resume a session from the refresh cookie alone.
    ///
    /// Returns whether a session is active afterwards. A failure clears local
    /// state without an `Expired` signal.
    pub async fn restore(&self) -> Result<bool, ClientError> {
        self.ensure_active()?;

        match self.refresh_shared().await {
            Ok(_) => Ok(true),
            Err(RefreshFailure::Disposed) => Err(ClientError::Disposed),
            Err(failure) => {
                tracing::debug!(error = %failure, "No session to restore");
                self.inner.state.clear();
                Ok(false)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let response = self
            .send(ApiRequest::post(LOGIN_PATH).json(json!({
                "email": email,
                "password": password,
            })))
            .await?;

        self.open_session(response)
    }

    pub async fn register(&self, registration: &Registration) -> Result<SessionUser, ClientError> {
        let body =
            serde_json::to_value(registration).map_err(|e| ClientError::Decode(e.to_string()))?;
        let response = self.send(ApiRequest::post(REGISTER_PATH).json(body)).await?;

        self.open_session(response)
    }

    fn open_session(&self, response: ApiResponse) -> Result<SessionUser, ClientError> {
        if !response.status.is_success() {
            return Err(response.into_error());
        }

        let token = response
            .access_token()
            .ok_or_else(|| ClientError::Decode("Response carried no access token".to_string()))?;
        let user: SessionUser = serde_json::from_value(response.body["data"]["user"].clone())
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        self.inner.state.sign_in(token, user.role.clone());
        let _ = self.inner.events.send(SessionEvent::SignedIn {
            role: user.role.clone(),
        });
        Ok(user)
    }

    /// End the session on the server, then locally.
    ///
    /// Local state is cleared even when the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.send(ApiRequest::post(LOGOUT_PATH)).await;

        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.state.clear();
        let _ = self.inner.events.send(SessionEvent::SignedOut);

        match result? {
            response if response.status.is_success() => Ok(()),
            response => Err(response.into_error()),
        }
    }
}

impl<T: Transport> Drop for ClientSessionController<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn is_session_endpoint(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    [LOGIN_PATH, REGISTER_PATH, REFRESH_PATH].contains(&path)
}
