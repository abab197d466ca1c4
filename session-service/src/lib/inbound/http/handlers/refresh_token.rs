use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::cookies::presented_refresh_token;
use crate::inbound::http::router::AppState;
use crate::session::errors::AuthError;

/// Rotate the refresh token carried by the cookie.
///
/// The cookie is the primary transport. A `refreshToken` field in the JSON
/// body is accepted only when no cookie is present.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<(CookieJar, ApiSuccess<RefreshTokenResponseData>), ApiError> {
    let presented = presented_refresh_token(&jar).or_else(|| {
        body.and_then(|Json(body)| body.refresh_token)
            .filter(|token| !token.is_empty())
    });

    let rotated = state
        .auth_service
        .refresh(presented.as_deref())
        .await
        .map_err(|e| match e {
            AuthError::MissingToken => {
                ApiError::Unauthorized("Refresh token required".to_string())
            }
            AuthError::InvalidToken | AuthError::TokenMismatch => {
                ApiError::Forbidden("Invalid refresh token".to_string())
            }
            _ => ApiError::from(e),
        })?;

    let jar = state.refresh_cookie.issue(jar, rotated.refresh_token);
    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            RefreshTokenResponseData {
                access_token: rotated.access_token,
            },
        ),
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponseData {
    pub access_token: String,
}
