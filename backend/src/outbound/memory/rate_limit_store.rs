//! In-memory fixed-window counters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::domain::ports::{RateLimitStore, RateLimitStoreError};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Counters guarded by a single lock, so each `consume` is atomic.
///
/// Elapsed counters are overwritten on the next attempt rather than swept.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl InMemoryRateLimitStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, RateLimitStoreError> {
        let mut counters = self.counters.lock().await;
        match counters.get_mut(key) {
            Some(counter) if now < counter.reset_at => {
                if counter.count >= limit {
                    return Ok(false);
                }
                counter.count += 1;
                Ok(true)
            }
            _ => {
                counters.insert(
                    key.to_owned(),
                    Counter {
                        count: 1,
                        reset_at: now + Duration::seconds(i64::from(window_seconds)),
                    },
                );
                Ok(true)
            }
        }
    }
}
