use std::sync::Arc;
use std::time::Duration;

use auth::TokenService;
use axum::body::Body;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookies::RefreshCookie;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::profile::get_user;
use super::handlers::profile::profile;
use super::handlers::refresh_token::refresh_token;
use super::handlers::register::register;
use super::middleware::enforce_guards;
use super::middleware::Guard;
use super::middleware::GuardChain;
use crate::domain::session::models::Role;
use crate::domain::session::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub tokens: Arc<TokenService>,
    pub refresh_cookie: RefreshCookie,
}

fn guarded(state: &AppState, guards: Vec<Guard>) -> GuardChain {
    GuardChain::new(Arc::clone(&state.tokens), guards)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    // Credentialed CORS needs an explicit origin; without one only same-origin
    // callers can carry the refresh cookie.
    match allowed_origin.and_then(|origin| HeaderValue::from_str(origin).ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        None => CorsLayer::new(),
    }
}

pub fn create_router(
    auth_service: Arc<dyn AuthServicePort>,
    tokens: Arc<TokenService>,
    refresh_cookie: RefreshCookie,
    allowed_origin: Option<&str>,
) -> Router {
    let state = AppState {
        auth_service,
        tokens,
        refresh_cookie,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token));

    let session_routes = Router::new()
        .route("/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            guarded(&state, vec![Guard::Authenticate]),
            enforce_guards,
        ));

    let profile_routes = Router::new()
        .route("/auth/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            guarded(
                &state,
                vec![Guard::Authenticate, Guard::RequireRoles(Role::ALL.to_vec())],
            ),
            enforce_guards,
        ));

    let user_routes = Router::new()
        .route("/users/:user_id", get(get_user))
        .route_layer(middleware::from_fn_with_state(
            guarded(
                &state,
                vec![Guard::Authenticate, Guard::SelfOrAdmin { param: "user_id" }],
            ),
            enforce_guards,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            // Headers stay out of the span: they carry bearer tokens and cookies
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(profile_routes)
        .merge(user_routes)
        .layer(trace_layer)
        .layer(cors_layer(allowed_origin))
        .with_state(state)
}
