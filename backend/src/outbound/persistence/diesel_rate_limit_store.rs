//! PostgreSQL-backed `RateLimitStore` using a single atomic upsert.
//!
//! The statement inserts a fresh counter, restarts an elapsed one, or
//! increments a live one below its limit. When the limit is reached the
//! `WHERE` clause suppresses the update, no row is returned, and the attempt
//! is denied without touching the stored count.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::sql_query;
use diesel::sql_types::{Integer, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use tracing::trace;

use crate::domain::ports::{RateLimitStore, RateLimitStoreError};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::ConsumedCounterRow;
use super::pool::{DbPool, PoolError};

const CONSUME_SQL: &str = r#"
INSERT INTO rate_limit_counters AS c (key, count, reset_at)
VALUES ($1, 1, $3)
ON CONFLICT (key)
DO UPDATE SET
    count = CASE WHEN c.reset_at <= $2 THEN 1 ELSE c.count + 1 END,
    reset_at = CASE WHEN c.reset_at <= $2 THEN EXCLUDED.reset_at ELSE c.reset_at END
WHERE c.reset_at <= $2 OR c.count < $4
RETURNING count
"#;

/// Diesel-backed implementation of the `RateLimitStore` port.
#[derive(Clone)]
pub struct DieselRateLimitStore {
    pool: DbPool,
}

impl DieselRateLimitStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RateLimitStoreError {
    map_basic_pool_error(error, RateLimitStoreError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> RateLimitStoreError {
    map_basic_diesel_error(
        error,
        RateLimitStoreError::query,
        RateLimitStoreError::connection,
    )
}

#[async_trait]
impl RateLimitStore for DieselRateLimitStore {
    async fn consume(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, RateLimitStoreError> {
        let reset_at = now + Duration::seconds(i64::from(window_seconds));
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ConsumedCounterRow> = sql_query(CONSUME_SQL)
            .bind::<Text, _>(key)
            .bind::<Timestamptz, _>(now)
            .bind::<Timestamptz, _>(reset_at)
            .bind::<Integer, _>(limit)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let admitted = rows.into_iter().next();
        trace!(
            count = admitted.as_ref().map(|row| row.count),
            "rate limit counter consumed"
        );
        Ok(admitted.is_some())
    }
}
