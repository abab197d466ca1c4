pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";
pub const LOGIN_ROUTE: &str = "/login";

/// Session lifecycle signals broadcast by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { role: String },
    Refreshed,
    SignedOut,
    /// A refresh failed terminally; the UI should show `message` and navigate
    /// to `redirect_to`.
    Expired { message: String, redirect_to: String },
}

impl SessionEvent {
    pub fn expired() -> Self {
        SessionEvent::Expired {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
            redirect_to: LOGIN_ROUTE.to_string(),
        }
    }
}
