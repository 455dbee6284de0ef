//! Backend entry-point: loads configuration, builds adapters, and serves HTTP.

mod server;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pantry_backend::inbound::http::health::HealthState;
use pantry_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use server::{AppConfig, BuildMode, ServerConfig, build_http_state, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_process_env(BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;

    let pool = match &config.database {
        Some(database) => {
            run_migrations(&database.url)
                .await
                .map_err(std::io::Error::other)?;
            let pool = DbPool::new(
                PoolConfig::new(database.url.clone()).with_max_size(database.max_connections),
            )
            .await
            .map_err(std::io::Error::other)?;
            pool.ping().await.map_err(std::io::Error::other)?;
            Some(pool)
        }
        None => None,
    };

    let http_state = build_http_state(&config, pool).map_err(std::io::Error::other)?;
    let server_config = ServerConfig::new(config.bind_addr, http_state)
        .with_cors_origin(config.cors_origin.clone());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, server_config)?;
    info!(addr = %config.bind_addr, "pantry backend listening");
    server.await
}
