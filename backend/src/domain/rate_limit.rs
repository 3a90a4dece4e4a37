//! Fixed-window rate limiting for unauthenticated publishing.
//!
//! Counter keys are HMAC signatures over `bucket:client:window`, so raw
//! client addresses never reach storage. The limiter fails open: when the
//! counter store errors the attempt is admitted and a warning is logged.

use std::sync::Arc;

use mockable::Clock;
use tracing::warn;

use super::ports::RateLimitStore;
use super::signer::Signer;

/// Bucket applied per client per minute to guest publishing.
pub const GUEST_MINUTE_BUCKET: &str = "guest-minute";
/// Bucket applied per client per day to guest publishing.
pub const GUEST_DAY_BUCKET: &str = "guest-day";

/// One fixed-window limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Bucket name; part of the counter key.
    pub bucket: &'static str,
    /// Attempts admitted per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_seconds: u32,
}

/// Per-client caps on guest publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestLimits {
    /// Attempts per minute.
    pub per_minute: u32,
    /// Attempts per day.
    pub per_day: u32,
}

impl Default for GuestLimits {
    fn default() -> Self {
        Self {
            per_minute: 5,
            per_day: 50,
        }
    }
}

impl GuestLimits {
    /// Rules evaluated in order: the minute bucket first.
    pub fn rules(&self) -> [RateLimitRule; 2] {
        [
            RateLimitRule {
                bucket: GUEST_MINUTE_BUCKET,
                limit: self.per_minute,
                window_seconds: 60,
            },
            RateLimitRule {
                bucket: GUEST_DAY_BUCKET,
                limit: self.per_day,
                window_seconds: 86_400,
            },
        ]
    }
}

/// Admits or denies attempts against signed counters.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    signer: Signer,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Build a limiter over `store`, keying counters with `signer`.
    pub fn new(store: Arc<dyn RateLimitStore>, signer: Signer, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            signer,
            clock,
        }
    }

    /// Storage key for one client in one bucket.
    ///
    /// The bucket name stays readable; the client identifier does not.
    pub fn counter_key(&self, rule: &RateLimitRule, client_id: &str) -> String {
        let material = format!("{}:{client_id}:{}", rule.bucket, rule.window_seconds);
        format!("{}:{}", rule.bucket, self.signer.sign(material.as_bytes()))
    }

    /// Count one attempt against `rule` and report whether it is admitted.
    pub async fn allow(&self, rule: &RateLimitRule, client_id: &str) -> bool {
        let key = self.counter_key(rule, client_id);
        let now = self.clock.utc();
        match self
            .store
            .consume(&key, rule.limit, rule.window_seconds, now)
            .await
        {
            Ok(admitted) => admitted,
            Err(error) => {
                warn!(%error, bucket = rule.bucket, "rate limit store failed; admitting request");
                true
            }
        }
    }

    /// Evaluate `rules` in order, stopping at the first denial.
    ///
    /// Returns the denying rule, if any.
    pub async fn admit(&self, rules: &[RateLimitRule], client_id: &str) -> Option<RateLimitRule> {
        for rule in rules {
            if !self.allow(rule, client_id).await {
                return Some(*rule);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockRateLimitStore, RateLimitStoreError};
    use crate::test_support::MutableClock;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(MutableClock::new(fixed_now()))
    }

    #[fixture]
    fn signer() -> Signer {
        Signer::new(b"rate-limit-secret").expect("valid secret")
    }

    fn limiter(store: MockRateLimitStore, signer: Signer) -> RateLimiter {
        RateLimiter::new(Arc::new(store), signer, clock())
    }

    #[rstest]
    fn keys_hide_the_client_and_separate_buckets(signer: Signer) {
        let limiter = limiter(MockRateLimitStore::new(), signer);
        let [minute, day] = GuestLimits::default().rules();
        let key = limiter.counter_key(&minute, "203.0.113.9");
        assert!(key.starts_with("guest-minute:"));
        assert!(!key.contains("203.0.113.9"));
        assert_ne!(key, limiter.counter_key(&day, "203.0.113.9"));
        assert_ne!(key, limiter.counter_key(&minute, "203.0.113.10"));
        assert_eq!(key, limiter.counter_key(&minute, "203.0.113.9"));
    }

    #[rstest]
    #[tokio::test]
    async fn forwards_rule_parameters_to_the_store(signer: Signer) {
        let mut store = MockRateLimitStore::new();
        store
            .expect_consume()
            .withf(|key, limit, window, now| {
                key.starts_with("guest-minute:")
                    && *limit == 5
                    && *window == 60
                    && *now == fixed_now()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(false));
        let limiter = limiter(store, signer);
        let [minute, _] = GuestLimits::default().rules();
        assert!(!limiter.allow(&minute, "client").await);
    }

    #[rstest]
    #[tokio::test]
    async fn store_failures_fail_open(signer: Signer) {
        let mut store = MockRateLimitStore::new();
        store
            .expect_consume()
            .returning(|_, _, _, _| Err(RateLimitStoreError::connection("down")));
        let limiter = limiter(store, signer);
        let rules = GuestLimits::default().rules();
        assert_eq!(limiter.admit(&rules, "client").await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn admit_stops_at_the_first_denial(signer: Signer) {
        let mut store = MockRateLimitStore::new();
        store
            .expect_consume()
            .withf(|key, _, _, _| key.starts_with("guest-minute:"))
            .times(1)
            .returning(|_, _, _, _| Ok(false));
        store
            .expect_consume()
            .withf(|key, _, _, _| key.starts_with("guest-day:"))
            .times(0);
        let limiter = limiter(store, signer);
        let rules = GuestLimits::default().rules();
        let denied = limiter.admit(&rules, "client").await.expect("denied");
        assert_eq!(denied.bucket, GUEST_MINUTE_BUCKET);
    }
}
