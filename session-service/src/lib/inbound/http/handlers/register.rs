use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::SessionResponseData;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::NewPassword;
use crate::domain::session::models::Profile;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::Role;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::router::AppState;
use crate::session::errors::EmailError;
use crate::session::errors::ProfileError;
use crate::session::errors::RoleError;

/// Create an account and open its first session.
///
/// Responds `201` with the user and an access token; the refresh token only
/// travels in the `Set-Cookie` header.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, ApiSuccess<SessionResponseData>), ApiError> {
    let session = state.auth_service.register(body.try_into_command()?).await?;

    let jar = state.refresh_cookie.issue(jar, session.refresh_token);
    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::CREATED,
            SessionResponseData {
                user: (&session.user).into(),
                access_token: session.access_token,
            },
        ),
    ))
}

/// HTTP request body for registration (raw JSON)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    student_id: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid role: {0}")]
    Role(#[from] RoleError),

    #[error("{0}")]
    Profile(#[from] ProfileError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let (email, password) = match (self.email, self.password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                (email, password)
            }
            _ => return Err(ParseRegisterRequestError::MissingCredentials),
        };

        let email = EmailAddress::new(email)?;
        let password = NewPassword::new(password)?;
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Role::default(),
            Some(role) => role.parse()?,
        };
        let profile = Profile::new(
            self.first_name,
            self.last_name,
            self.student_id,
            self.phone_number,
        )?;

        Ok(RegisterCommand {
            email,
            password,
            role,
            profile,
        })
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
