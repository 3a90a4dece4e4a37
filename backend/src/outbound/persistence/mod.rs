//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories are thin: they translate between Diesel rows and domain
//! types and map database failures onto port errors. Row structs and table
//! definitions stay private to this module.
//!
//! # Example
//!
//! ```no_run
//! use renderboard::outbound::persistence::{DbPool, DieselDiagramRepository, PoolConfig};
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/renderboard")).await?;
//! let diagrams = DieselDiagramRepository::new(pool);
//! # let _ = diagrams;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_diagram_repository;
mod diesel_rate_limit_store;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_diagram_repository::DieselDiagramRepository;
pub use diesel_rate_limit_store::DieselRateLimitStore;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
