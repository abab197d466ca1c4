use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::Principal;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::router::AppState;
use crate::session::errors::AuthError;

pub async fn logout(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<LogoutResponseData>), ApiError> {
    let Extension(principal) = principal.ok_or(AuthError::Unauthenticated)?;

    state.auth_service.logout(&principal.user_id).await?;

    Ok((
        state.refresh_cookie.clear(jar),
        ApiSuccess::new(
            StatusCode::OK,
            LogoutResponseData {
                message: "Logged out successfully".to_string(),
            },
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub message: String,
}
