//! Client side of the session protocol.
//!
//! [`ClientSessionController`] keeps the access token in memory (mirrored to a
//! [`TokenCache`] so it survives restarts) and leaves the refresh token to the
//! transport's cookie jar. Requests that come back `401` are refreshed and
//! replayed once, with concurrent failures sharing a single refresh.
//!
//! ```no_run
//! use session_client::{ApiRequest, ClientSessionController, MemoryTokenCache, ReqwestTransport};
//!
//! # async fn run() -> Result<(), session_client::ClientError> {
//! let transport = ReqwestTransport::new("http://localhost:8080")?;
//! let controller = ClientSessionController::new(transport, MemoryTokenCache::new());
//!
//! controller.login("a@x.com", "Abc12345!").await?;
//! let profile = controller.send(ApiRequest::get("/auth/profile")).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod controller;
pub mod errors;
pub mod events;
pub mod state;
pub mod transport;

pub use cache::CachedSession;
pub use cache::FileTokenCache;
pub use cache::MemoryTokenCache;
pub use cache::TokenCache;
pub use controller::ClientSessionController;
pub use controller::Registration;
pub use controller::SessionUser;
pub use errors::ClientError;
pub use errors::RefreshFailure;
pub use events::SessionEvent;
pub use state::SessionState;
pub use transport::ApiRequest;
pub use transport::ApiResponse;
pub use transport::ReqwestTransport;
pub use transport::Transport;
