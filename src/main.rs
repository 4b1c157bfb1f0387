use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cinematch_api::{
    card::TrailerPreference,
    config::{Config, RuntimeMode},
    db::{create_redis_client, Cache, Database, PoolSettings},
    middleware::auth::JwtKeys,
    routes::{create_router, AppState},
    services::{PgRatingRepository, TmdbProvider},
};

fn init_tracing(mode: RuntimeMode) {
    let default_filter = if mode.is_development() {
        "cinematch_api=debug,tower_http=debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.app_env);

    // The server keeps running without a database; reads degrade to empty results.
    let db = Database::connect(&PoolSettings::from(&config), config.app_env);
    if db.test_connection().await {
        db.migrate().await;
    }

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);

    let state = Arc::new(AppState {
        db: db.clone(),
        ratings: Arc::new(PgRatingRepository::new(db.clone())),
        metadata: Arc::new(TmdbProvider::from_config(cache, &config)),
        jwt: JwtKeys::new(&config.jwt_secret),
        trailer_preference: TrailerPreference::from_config(&config),
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, mode = ?config.app_env, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    db.shutdown().await;

    Ok(())
}
