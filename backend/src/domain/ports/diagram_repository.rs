//! Port abstraction for diagram persistence.
//!
//! Adapters own row-level atomicity only: every method is a single
//! statement (or equivalent critical section). Authorisation is enforced by
//! callers before a mutation reaches the repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Diagram, DiagramId, ShareState, ShareToken, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by diagram repository adapters.
    pub enum DiagramPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "diagram repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "diagram repository query failed: {message}",
        /// The share token is already attached to another diagram.
        ShareTokenConflict => "share token already in use",
    }
}

/// Title and description replacement applied by an owner edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDetailsUpdate {
    /// Replacement title.
    pub title: String,
    /// Replacement description.
    pub description: Option<String>,
    /// Modification timestamp.
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiagramRepository: Send + Sync {
    /// Insert a new diagram.
    ///
    /// Returns [`DiagramPersistenceError::ShareTokenConflict`] when the
    /// diagram's share token collides with an existing one.
    async fn insert(&self, diagram: &Diagram) -> Result<(), DiagramPersistenceError>;

    /// Fetch a diagram by identifier.
    async fn find_by_id(&self, id: &DiagramId) -> Result<Option<Diagram>, DiagramPersistenceError>;

    /// Fetch the diagram carrying `token`, regardless of share state.
    async fn find_by_share_token(
        &self,
        token: &ShareToken,
    ) -> Result<Option<Diagram>, DiagramPersistenceError>;

    /// Diagrams owned by `owner`, newest first.
    async fn list_by_owner(
        &self,
        owner: &UserId,
        limit: usize,
    ) -> Result<Vec<Diagram>, DiagramPersistenceError>;

    /// Replace title and description. Returns the updated row, if any.
    async fn update_details(
        &self,
        id: &DiagramId,
        update: &DiagramDetailsUpdate,
    ) -> Result<Option<Diagram>, DiagramPersistenceError>;

    /// Replace the share state. Returns the updated row, if any.
    ///
    /// Returns [`DiagramPersistenceError::ShareTokenConflict`] when a new
    /// token collides with another diagram's.
    async fn update_share(
        &self,
        id: &DiagramId,
        share: &ShareState,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Diagram>, DiagramPersistenceError>;

    /// Record the blob key of the diagram's snapshot.
    async fn set_image_ref(
        &self,
        id: &DiagramId,
        image_ref: &str,
    ) -> Result<bool, DiagramPersistenceError>;

    /// Remove a diagram. Returns `false` when no row existed.
    async fn delete(&self, id: &DiagramId) -> Result<bool, DiagramPersistenceError>;
}
