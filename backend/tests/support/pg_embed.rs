//! Embedded PostgreSQL bootstrap for the Diesel adapter suites.
//!
//! Each test binary shares one cluster and provisions a fresh, migrated
//! database per test. Tests drive the async adapters from a dedicated runtime
//! because the cluster bootstrap blocks and must not run inside one.
//!
//! Set `SKIP_TEST_CLUSTER=1` where the cluster cannot start; affected tests
//! then print a skip marker instead of failing.

use std::future::Future;

use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use renderboard::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use tokio::runtime::Runtime;

/// True when `SKIP_TEST_CLUSTER` is "1", "true", or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when allowed, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    pg_embedded_setup_unpriv::test_support::shared_cluster_handle()
        .map_err(|err| format!("shared cluster: {err:?}"))
}

/// A migrated temporary database with a pool and the runtime that drives it.
///
/// Field order matters: the pool closes before the runtime stops, and the
/// database is dropped last once no connection remains.
pub struct PgDatabase {
    pub pool: DbPool,
    runtime: Runtime,
    _database: TemporaryDatabase,
}

impl PgDatabase {
    /// Run an adapter future to completion.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn provision() -> Result<PgDatabase, String> {
    let cluster = shared_cluster()?;
    let name = format!("test_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name.as_str())
        .map_err(|err| format!("temporary database: {err:?}"))?;
    let url = database.url().to_string();

    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    runtime
        .block_on(run_migrations(&url))
        .map_err(|err| err.to_string())?;
    let config = PoolConfig::new(&url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    Ok(PgDatabase {
        pool,
        runtime,
        _database: database,
    })
}

/// Fresh database for one test, or `None` when the cluster is skipped.
pub fn pg_database() -> Option<PgDatabase> {
    match provision() {
        Ok(database) => Some(database),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}
