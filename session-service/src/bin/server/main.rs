use std::sync::Arc;

use auth::TokenService;
use session_service::config::Config;
use session_service::config::StorageBackend;
use session_service::domain::session::ports::AuthServicePort;
use session_service::domain::session::service::AuthSessionManager;
use session_service::inbound::http::cookies::RefreshCookie;
use session_service::inbound::http::router::create_router;
use session_service::outbound::repositories::InMemoryUserStore;
use session_service::outbound::repositories::PostgresUserStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "session-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        storage = ?config.storage.backend,
        access_ttl_seconds = config.jwt.access_ttl_seconds,
        refresh_ttl_seconds = config.jwt.refresh_ttl_seconds,
        secure_cookie = config.cookie.secure,
        "Configuration loaded"
    );

    let tokens = Arc::new(TokenService::new(&config.jwt.token_settings())?);

    let auth_service: Arc<dyn AuthServicePort> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Arc::new(AuthSessionManager::new(
                Arc::new(PostgresUserStore::new(pg_pool)),
                Arc::clone(&tokens),
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory user store; users are lost on restart");
            Arc::new(AuthSessionManager::new(
                Arc::new(InMemoryUserStore::new()),
                Arc::clone(&tokens),
            ))
        }
    };

    let refresh_cookie = RefreshCookie::new(config.cookie.secure, tokens.refresh_ttl());

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        auth_service,
        tokens,
        refresh_cookie,
        config.server.allowed_origin.as_deref(),
    );

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");
    Ok(())
}
