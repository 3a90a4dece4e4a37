//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod blob_store;
mod diagram_repository;
mod identity_provider;
mod rate_limit_store;
mod user_repository;

#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{Blob, BlobStore, BlobStoreError};
#[cfg(test)]
pub use diagram_repository::MockDiagramRepository;
pub use diagram_repository::{DiagramDetailsUpdate, DiagramPersistenceError, DiagramRepository};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{ExternalIdentity, IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use rate_limit_store::MockRateLimitStore;
pub use rate_limit_store::{RateLimitStore, RateLimitStoreError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
