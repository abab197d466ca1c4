use std::collections::HashMap;
use std::sync::Arc;

use auth::TokenService;
use axum::extract::RawPathParams;
use axum::extract::Request;
use axum::extract::State;
use axum::http;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::session::models::Principal;
use crate::domain::session::models::Role;
use crate::domain::session::models::UserId;
use crate::session::errors::AuthError;

/// One access check in a route's guard list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Require a valid `Authorization: Bearer <access token>` and attach the
    /// caller's [`Principal`] to the request.
    Authenticate,
    /// Require an authenticated caller whose role is in the list.
    RequireRoles(Vec<Role>),
    /// Require an admin, or a caller whose id equals the named path parameter.
    SelfOrAdmin { param: &'static str },
}

/// What the guards see of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub authorization: Option<String>,
    pub path_params: HashMap<String, String>,
    pub principal: Option<Principal>,
}

impl RequestContext {
    fn from_request(req: &Request, path_params: Option<RawPathParams>) -> Self {
        let authorization = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let path_params = path_params
            .map(|params| {
                params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            authorization,
            path_params,
            principal: None,
        }
    }

    fn bearer_token(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

impl Guard {
    /// Run this guard against the context.
    ///
    /// # Errors
    /// * `MissingToken` - No bearer token on an `Authenticate` guard
    /// * `InvalidToken` - Bearer token fails verification or carries bad claims
    /// * `Unauthenticated` - Authorization guard ran before any authentication
    /// * `Forbidden` - Caller is authenticated but not allowed
    pub fn check(
        &self,
        tokens: &TokenService,
        context: &mut RequestContext,
    ) -> Result<(), AuthError> {
        match self {
            Guard::Authenticate => {
                let token = context.bearer_token().ok_or(AuthError::MissingToken)?;

                let claims = tokens.verify_access(token).map_err(|e| {
                    tracing::warn!(error = %e, "Access token rejected");
                    AuthError::InvalidToken
                })?;

                let user_id = UserId::from_string(&claims.sub).map_err(|e| {
                    tracing::warn!(error = %e, "Access token subject is not a user id");
                    AuthError::InvalidToken
                })?;
                let role = claims.role.parse::<Role>().map_err(|e| {
                    tracing::warn!(error = %e, "Access token carries an unknown role");
                    AuthError::InvalidToken
                })?;

                context.principal = Some(Principal {
                    user_id,
                    email: claims.email,
                    role,
                });
                Ok(())
            }
            Guard::RequireRoles(roles) => {
                let principal = context
                    .principal
                    .as_ref()
                    .ok_or(AuthError::Unauthenticated)?;

                if roles.contains(&principal.role) {
                    Ok(())
                } else {
                    Err(AuthError::Forbidden)
                }
            }
            Guard::SelfOrAdmin { param } => {
                let principal = context
                    .principal
                    .as_ref()
                    .ok_or(AuthError::Unauthenticated)?;

                if principal.role == Role::Admin {
                    return Ok(());
                }

                let requested = context
                    .path_params
                    .get(*param)
                    .and_then(|raw| UserId::from_string(raw).ok());
                if requested == Some(principal.user_id) {
                    Ok(())
                } else {
                    Err(AuthError::Forbidden)
                }
            }
        }
    }
}

/// Ordered guard list for a group of routes, used as middleware state.
#[derive(Clone)]
pub struct GuardChain {
    tokens: Arc<TokenService>,
    guards: Arc<[Guard]>,
}

impl GuardChain {
    pub fn new(tokens: Arc<TokenService>, guards: impl Into<Vec<Guard>>) -> Self {
        let guards: Vec<Guard> = guards.into();

        Self {
            tokens,
            guards: guards.into(),
        }
    }

    /// Run every guard in order; the first failure wins.
    pub fn run(&self, context: &mut RequestContext) -> Result<(), AuthError> {
        self.guards
            .iter()
            .try_for_each(|guard| guard.check(&self.tokens, context))
    }
}

/// Middleware that runs a [`GuardChain`] and attaches the authenticated
/// [`Principal`] to request extensions.
pub async fn enforce_guards(
    State(chain): State<GuardChain>,
    path_params: Option<RawPathParams>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut context = RequestContext::from_request(&req, path_params);

    chain.run(&mut context).map_err(|e| {
        tracing::debug!(error = %e, uri = %req.uri(), "Request stopped by guard");
        ApiError::from(e)
    })?;

    if let Some(principal) = context.principal {
        req.extensions_mut().insert(principal);
    }

    Ok(next.run(req).await)
}
