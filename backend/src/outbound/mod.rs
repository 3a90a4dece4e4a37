//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories and the rate-limit
//!   counter store using Diesel ORM
//! - **memory**: in-process adapters used without a database and in tests
//! - **fs_blob_store**: snapshot images on a capability-scoped directory
//! - **identity**: the OAuth identity provider client
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod fs_blob_store;
pub mod identity;
pub mod memory;
pub mod persistence;

pub use fs_blob_store::FsBlobStore;
