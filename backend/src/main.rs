//! Backend entry-point: loads settings, selects adapters, and serves the
//! gallery API.

mod server;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use renderboard::inbound::http::health::HealthState;
use renderboard::inbound::http::session_config::{BuildMode, session_secret_from_env};
use renderboard::outbound::persistence::{DbPool, PoolConfig, run_migrations};

use server::{AppSettings, ServerConfig, create_server};

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

    let settings = AppSettings::load()
        .map_err(|err| std::io::Error::other(format!("failed to load settings: {err}")))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| std::io::Error::other(format!("invalid bind address: {err}")))?;
    let secret = session_secret_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;

    let mut config = ServerConfig::new(secret, bind_addr, settings.public_base_url())
        .with_blob_dir(settings.blob_dir.clone())
        .with_oauth(settings.oauth_credentials())
        .with_guest_limits(settings.guest_limits())
        .with_trusted_cdn_header(settings.trust_cdn_header);

    if let Some(database_url) = settings.database_url.as_deref() {
        run_migrations(database_url)
            .await
            .map_err(std::io::Error::other)?;
        let pool = DbPool::new(PoolConfig::new(database_url))
            .await
            .map_err(|err| std::io::Error::other(format!("database pool: {err}")))?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting renderboard");
    create_server(health_state, config)?.await
}
