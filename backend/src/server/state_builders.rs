//! Adapter selection for the HTTP state.
//!
//! Each port resolves to its durable adapter when configured and to the
//! in-memory adapter otherwise, so a bare `cargo run` serves a working
//! (if forgetful) gallery.

use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use renderboard::domain::ports::{
    BlobStore, DiagramRepository, IdentityProvider, RateLimitStore, UserRepository,
};
use renderboard::domain::{
    AuthService, DiagramService, GalleryService, RateLimiter, SessionCodec, Signer,
};
use renderboard::inbound::http::state::HttpState;
use renderboard::outbound::FsBlobStore;
use renderboard::outbound::identity::{
    DisabledIdentityProvider, GoogleEndpoints, GoogleIdentityProvider,
};
use renderboard::outbound::memory::{
    InMemoryBlobStore, InMemoryDiagramRepository, InMemoryRateLimitStore, InMemoryUserRepository,
};
use renderboard::outbound::persistence::{
    DbPool, DieselDiagramRepository, DieselRateLimitStore, DieselUserRepository,
};

use super::ServerConfig;

const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Repository ports backed by one storage choice.
struct Repositories {
    users: Arc<dyn UserRepository>,
    diagrams: Arc<dyn DiagramRepository>,
    rate_limits: Arc<dyn RateLimitStore>,
}

fn build_repositories(pool: Option<&DbPool>) -> Repositories {
    match pool {
        Some(pool) => Repositories {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            diagrams: Arc::new(DieselDiagramRepository::new(pool.clone())),
            rate_limits: Arc::new(DieselRateLimitStore::new(pool.clone())),
        },
        None => {
            warn!("no database configured; diagrams are kept in memory");
            Repositories {
                users: Arc::new(InMemoryUserRepository::new()),
                diagrams: Arc::new(InMemoryDiagramRepository::new()),
                rate_limits: Arc::new(InMemoryRateLimitStore::new()),
            }
        }
    }
}

fn build_blob_store(config: &ServerConfig) -> std::io::Result<Arc<dyn BlobStore>> {
    match &config.blob_dir {
        Some(dir) => {
            let store = FsBlobStore::open(dir).map_err(|err| {
                std::io::Error::other(format!(
                    "failed to open blob directory {}: {err}",
                    dir.display()
                ))
            })?;
            info!(path = %dir.display(), "storing snapshots on disk");
            Ok(Arc::new(store))
        }
        None => {
            warn!("no blob directory configured; snapshots are kept in memory");
            Ok(Arc::new(InMemoryBlobStore::new()))
        }
    }
}

fn build_identity_provider(config: &ServerConfig) -> std::io::Result<Arc<dyn IdentityProvider>> {
    let Some(credentials) = &config.oauth else {
        warn!("OAuth credentials missing; login routes answer 503");
        return Ok(Arc::new(DisabledIdentityProvider));
    };
    let endpoints = GoogleEndpoints::google()
        .map_err(|err| std::io::Error::other(format!("invalid OAuth endpoint: {err}")))?;
    let provider = GoogleIdentityProvider::new(
        credentials.clone(),
        endpoints,
        &config.public_base_url,
        IDENTITY_TIMEOUT,
    )
    .map_err(|err| std::io::Error::other(format!("failed to build OAuth client: {err}")))?;
    Ok(Arc::new(provider))
}

/// Wire domain services over the configured adapters.
///
/// # Errors
///
/// Fails when the session secret is rejected, the blob directory cannot be
/// opened, or the OAuth client cannot be built.
pub(super) fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let signer = Signer::new(config.secret.expose())
        .map_err(|err| std::io::Error::other(format!("invalid session secret: {err}")))?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let repositories = build_repositories(config.db_pool.as_ref());
    let blobs = build_blob_store(config)?;
    let identity = build_identity_provider(config)?;

    let diagrams = DiagramService::new(repositories.diagrams, blobs, clock.clone());
    let limiter = RateLimiter::new(repositories.rate_limits, signer.clone(), clock);
    let gallery = GalleryService::new(diagrams, limiter, config.guest_limits);
    let auth = AuthService::new(identity, repositories.users);

    Ok(HttpState::new(
        gallery,
        auth,
        SessionCodec::new(signer),
        config.public_base_url.as_str(),
    )
    .with_trusted_cdn_header(config.trust_cdn_header))
}
