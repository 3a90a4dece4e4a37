//! Shared test doubles for unit and integration tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    Blob, BlobStore, BlobStoreError, ExternalIdentity, IdentityProvider, IdentityProviderError,
    RateLimitStore, RateLimitStoreError,
};
use crate::domain::{
    AuthService, DiagramService, GalleryService, GuestLimits, RateLimiter, SessionCodec, Signer,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::memory::{
    InMemoryBlobStore, InMemoryDiagramRepository, InMemoryRateLimitStore, InMemoryUserRepository,
};

/// Authorisation code accepted by [`StaticIdentityProvider`].
pub const GOOD_CODE: &str = "good-code";
/// Secret used to sign sessions in [`memory_http_state`].
pub const TEST_SESSION_SECRET: &[u8] = b"renderboard-test-session-secret!";

/// Clock frozen at a settable instant.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    pub fn advance_days(&self, days: i64) {
        *self.lock_clock() += TimeDelta::days(days);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Blob store whose every operation fails with an I/O error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, _key: &str, _blob: Blob) -> Result<(), BlobStoreError> {
        Err(BlobStoreError::io("blob store offline"))
    }

    async fn get(&self, _key: &str) -> Result<Option<Blob>, BlobStoreError> {
        Err(BlobStoreError::io("blob store offline"))
    }

    async fn delete(&self, _key: &str) -> Result<(), BlobStoreError> {
        Err(BlobStoreError::io("blob store offline"))
    }
}

/// Counter store that always errors, for exercising fail-open behaviour.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRateLimitStore;

#[async_trait]
impl RateLimitStore for FailingRateLimitStore {
    async fn consume(
        &self,
        _key: &str,
        _limit: u32,
        _window_seconds: u32,
        _now: DateTime<Utc>,
    ) -> Result<bool, RateLimitStoreError> {
        Err(RateLimitStoreError::connection("counter store offline"))
    }
}

/// Identity provider asserting one fixed identity for [`GOOD_CODE`].
pub struct StaticIdentityProvider {
    identity: ExternalIdentity,
}

impl StaticIdentityProvider {
    pub fn new(identity: ExternalIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> Result<String, IdentityProviderError> {
        Ok(format!("https://idp.test/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityProviderError> {
        if code == GOOD_CODE {
            Ok(self.identity.clone())
        } else {
            Err(IdentityProviderError::rejected("unknown code"))
        }
    }
}

/// Fixed start instant for fixture clocks.
pub fn fixture_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 14, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// In-memory wiring of the full HTTP state.
pub struct MemoryHarness {
    pub state: HttpState,
    pub clock: Arc<MutableClock>,
    pub sessions: SessionCodec,
}

/// Build [`HttpState`] over in-memory adapters with a controllable clock.
///
/// # Panics
///
/// Panics if the built-in test secret is rejected, which would be a bug in
/// [`Signer`].
pub fn memory_http_state(
    blobs: Arc<dyn BlobStore>,
    limits: GuestLimits,
    identity: ExternalIdentity,
) -> MemoryHarness {
    let clock = Arc::new(MutableClock::new(fixture_instant()));
    let signer = match Signer::new(TEST_SESSION_SECRET) {
        Ok(signer) => signer,
        Err(err) => panic!("test secret rejected: {err}"),
    };
    let diagrams = DiagramService::new(
        Arc::new(InMemoryDiagramRepository::new()),
        blobs,
        clock.clone(),
    );
    let limiter = RateLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        signer.clone(),
        clock.clone(),
    );
    let gallery = GalleryService::new(diagrams, limiter, limits);
    let auth = AuthService::new(
        Arc::new(StaticIdentityProvider::new(identity)),
        Arc::new(InMemoryUserRepository::new()),
    );
    let sessions = SessionCodec::new(signer);
    let state = HttpState::new(gallery, auth, sessions.clone(), "https://board.test");
    MemoryHarness {
        state,
        clock,
        sessions,
    }
}

/// Memory harness with a working blob store and default guest limits.
pub fn default_memory_http_state(identity: ExternalIdentity) -> MemoryHarness {
    memory_http_state(
        Arc::new(InMemoryBlobStore::new()),
        GuestLimits::default(),
        identity,
    )
}
