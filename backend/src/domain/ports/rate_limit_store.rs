//! Port abstraction for fixed-window rate-limit counters.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;

define_port_error! {
    /// Errors raised by counter storage.
    pub enum RateLimitStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "rate limit store connection failed: {message}",
        /// Counter update failed.
        Query { message: String } => "rate limit store query failed: {message}",
    }
}

/// Atomic counter storage keyed by opaque strings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one attempt against `key` and report whether it is admitted.
    ///
    /// In one atomic step: a missing or elapsed counter restarts at 1 with
    /// `reset_at = now + window_seconds` and is admitted; otherwise the
    /// attempt is admitted and counted iff `count < limit`. Denied attempts
    /// leave the counter untouched.
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, RateLimitStoreError>;
}
