// Application entrypoint. Loads configuration, sets up logging, picks the storage backend
// and serves the router until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{http::HeaderValue, Router};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use workout_api::config::{AppConfig, DatabaseConfig};
use workout_api::handlers::{app, AppState};
use workout_api::repository::{ensure_schema, RepositoryFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,axum=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).compact().init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Fall back to the in-memory store when Postgres is unavailable.
    let pool = connect(&cfg.database).await;
    let repos = match pool {
        Some(ref p) => RepositoryFactory::postgres(p.clone()),
        None => RepositoryFactory::in_memory(),
    };
    let state = AppState::new(repos, pool);

    let router: Router = app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors_layer(&cfg.server.cors_allowed_origins)),
    );

    let ip = cfg.server.host.parse().with_context(|| format!("invalid HOST {:?}", cfg.server.host))?;
    let addr = SocketAddr::new(ip, cfg.server.port);
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn connect(db: &DatabaseConfig) -> Option<sqlx::PgPool> {
    let pool = match PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(db.connect_timeout)
        .connect(&db.url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Postgres not available; starting with in-memory repositories");
            return None;
        }
    };
    if let Err(e) = ensure_schema(&pool).await {
        tracing::error!(error = %e, "schema bootstrap failed; starting with in-memory repositories");
        return None;
    }
    tracing::info!(max_connections = db.max_connections, "connected to Postgres");
    Some(pool)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler"); };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install signal handler");
        term.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
}
