use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionResponseData;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, ApiSuccess<SessionResponseData>), ApiError> {
    let session = state.auth_service.login(body.try_into_command()?).await?;

    let jar = state.refresh_cookie.issue(jar, session.refresh_token);
    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            SessionResponseData {
                user: (&session.user).into(),
                access_token: session.access_token,
            },
        ),
    ))
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

impl LoginRequest {
    fn try_into_command(self) -> Result<LoginCommand, ApiError> {
        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;
        let password = self
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

        let email = EmailAddress::new(email)
            .map_err(|e| ApiError::BadRequest(format!("Invalid email: {}", e)))?;

        Ok(LoginCommand { email, password })
    }
}
