//! In-memory adapters.
//!
//! Used when no database or blob directory is configured, and by tests that
//! exercise the real route table. State lives only as long as the process.

mod blob_store;
mod diagram_repository;
mod rate_limit_store;
mod user_repository;

pub use blob_store::InMemoryBlobStore;
pub use diagram_repository::InMemoryDiagramRepository;
pub use rate_limit_store::InMemoryRateLimitStore;
pub use user_repository::InMemoryUserRepository;
