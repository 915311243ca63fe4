//! babylog server entry point.
//!
//! Loads configuration, picks the storage backend and starts the Axum
//! HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::IntoResponse;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use babylog::api;
use babylog::app_state::AppState;
use babylog::config::{LogFormat, TrackerConfig};
use babylog::store::{MemoryStore, PostgresStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = TrackerConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting babylog");

    // Build storage layer
    let store: Arc<dyn Storage> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        let postgres = PostgresStore::new(pool);
        postgres.migrate().await?;
        tracing::info!("using PostgreSQL storage");
        Arc::new(postgres)
    } else {
        tracing::warn!("persistence disabled, data lives in memory only");
        Arc::new(MemoryStore::new())
    };

    // Build application state
    let app_state = AppState::new(store);

    // Build router
    let middleware = ServiceBuilder::new()
        .layer(CorsLayer::permissive())
        .map_response(IntoResponse::into_response)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )));
    let app = Router::new()
        .merge(api::build_router())
        .layer(middleware)
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
