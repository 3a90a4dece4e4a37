//! Diagram storage operations and the share-token state machine.
//!
//! [`DiagramService`] performs no authorisation. Callers run
//! [`AccessGate`](super::AccessGate) first; see
//! [`GalleryService`](super::GalleryService) for the composed use cases.
//!
//! Mutations write the row before the blob, so an interrupted upload leaves a
//! diagram without an image rather than an unreferenced blob.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use tracing::{info, warn};

use super::diagram::{
    Diagram, DiagramDraft, DiagramId, DiagramPatch, DiagramValidationError, SNAPSHOT_CONTENT_TYPE,
    ShareAction, ShareState, ShareStatus, ShareToken, SnapshotImage,
};
use super::error::Error;
use super::ports::{
    Blob, BlobStore, BlobStoreError, DiagramDetailsUpdate, DiagramPersistenceError,
    DiagramRepository,
};
use super::user::UserId;

/// Lifetime of the share link issued to guest diagrams.
pub const GUEST_SHARE_DAYS: i64 = 3;
/// Longest share lifetime an owner may request.
pub const SHARE_DAYS_MAX: u32 = 365;
/// Default page size for owner listings.
pub const LIST_LIMIT_DEFAULT: usize = 30;
/// Largest page size for owner listings.
pub const LIST_LIMIT_MAX: usize = 100;

const TOKEN_ATTEMPTS: usize = 5;

/// A diagram resolved through its share token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDiagram {
    /// The diagram carrying the token.
    pub diagram: Diagram,
    /// Share activity at lookup time.
    pub status: ShareStatus,
}

/// Storage operations over diagrams and their snapshots.
#[derive(Clone)]
pub struct DiagramService {
    diagrams: Arc<dyn DiagramRepository>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

fn map_persistence_error(error: DiagramPersistenceError) -> Error {
    match error {
        DiagramPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("diagram repository unavailable: {message}"))
        }
        DiagramPersistenceError::Query { message } => {
            Error::internal(format!("diagram repository error: {message}"))
        }
        DiagramPersistenceError::ShareTokenConflict => {
            Error::internal("share token collided after repeated attempts")
        }
    }
}

fn map_blob_error(error: BlobStoreError) -> Error {
    match error {
        BlobStoreError::InvalidKey { key } => Error::internal(format!("invalid blob key: {key}")),
        BlobStoreError::Io { message } => {
            Error::service_unavailable(format!("blob store unavailable: {message}"))
        }
    }
}

fn not_found() -> Error {
    Error::not_found("diagram not found")
}

impl DiagramService {
    /// Create a service over the given collaborators.
    pub fn new(
        diagrams: Arc<dyn DiagramRepository>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            diagrams,
            blobs,
            clock,
        }
    }

    /// Current instant according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Persist a diagram owned by `owner`.
    pub async fn create_owned(
        &self,
        owner: &UserId,
        draft: DiagramDraft,
    ) -> Result<Diagram, Error> {
        let now = self.now();
        let diagram = Diagram {
            id: DiagramId::random(),
            owner_id: Some(owner.clone()),
            title: draft.title.as_ref().to_owned(),
            description: draft.description,
            mode: draft.mode,
            code: draft.code.as_ref().to_owned(),
            is_private: draft.is_private,
            image_ref: None,
            share: ShareState::default(),
            created_at: now,
            updated_at: now,
        };
        self.diagrams
            .insert(&diagram)
            .await
            .map_err(map_persistence_error)?;
        info!(diagram_id = %diagram.id, owner_id = %owner, "diagram created");
        Ok(diagram)
    }

    /// Persist an ownerless diagram with a fresh three-day share link.
    ///
    /// Guest diagrams are always private; the requested privacy is ignored.
    pub async fn create_guest(&self, draft: DiagramDraft) -> Result<Diagram, Error> {
        let now = self.now();
        let mut diagram = Diagram {
            id: DiagramId::random(),
            owner_id: None,
            title: draft.title.as_ref().to_owned(),
            description: draft.description,
            mode: draft.mode,
            code: draft.code.as_ref().to_owned(),
            is_private: true,
            image_ref: None,
            share: ShareState {
                enabled: true,
                token: None,
                expires_at: Some(now + Duration::days(GUEST_SHARE_DAYS)),
            },
            created_at: now,
            updated_at: now,
        };
        for _ in 0..TOKEN_ATTEMPTS {
            diagram.share.token = Some(ShareToken::generate());
            match self.diagrams.insert(&diagram).await {
                Ok(()) => {
                    info!(diagram_id = %diagram.id, "guest diagram created");
                    return Ok(diagram);
                }
                Err(DiagramPersistenceError::ShareTokenConflict) => {
                    warn!(diagram_id = %diagram.id, "share token collision; regenerating");
                }
                Err(error) => return Err(map_persistence_error(error)),
            }
        }
        Err(map_persistence_error(
            DiagramPersistenceError::share_token_conflict(),
        ))
    }

    /// Store a snapshot under the diagram's deterministic key and record it.
    ///
    /// Returns `false` when storage failed; the diagram itself is unaffected.
    /// Re-invocation overwrites the previous snapshot.
    pub async fn attach_image(&self, id: &DiagramId, image: SnapshotImage) -> bool {
        let key = SnapshotImage::key_for(id);
        let blob = Blob {
            bytes: image.into_bytes(),
            content_type: SNAPSHOT_CONTENT_TYPE.to_owned(),
        };
        if let Err(error) = self.blobs.put(&key, blob).await {
            warn!(diagram_id = %id, %error, "snapshot upload failed");
            return false;
        }
        match self.diagrams.set_image_ref(id, &key).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(diagram_id = %id, "diagram vanished before snapshot was recorded");
                false
            }
            Err(error) => {
                warn!(diagram_id = %id, %error, "failed to record snapshot reference");
                false
            }
        }
    }

    /// Fetch a diagram by id.
    pub async fn get(&self, id: &DiagramId) -> Result<Diagram, Error> {
        self.diagrams
            .find_by_id(id)
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(not_found)
    }

    /// Resolve a share token, reporting whether its share is still active.
    ///
    /// Inactive shares still resolve so callers can apply the degraded
    /// access rule.
    pub async fn get_by_share_token(&self, token: &ShareToken) -> Result<SharedDiagram, Error> {
        let diagram = self
            .diagrams
            .find_by_share_token(token)
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(|| Error::not_found("share not found"))?;
        let status = if diagram.share.is_active(self.now()) {
            ShareStatus::Active
        } else {
            ShareStatus::Expired
        };
        Ok(SharedDiagram { diagram, status })
    }

    /// Diagrams owned by `owner`, newest first, clamped to [`LIST_LIMIT_MAX`].
    pub async fn list_owned(&self, owner: &UserId, limit: usize) -> Result<Vec<Diagram>, Error> {
        let limit = limit.clamp(1, LIST_LIMIT_MAX);
        self.diagrams
            .list_by_owner(owner, limit)
            .await
            .map_err(map_persistence_error)
    }

    /// Apply a title/description patch and re-stamp `updated_at`.
    pub async fn update(&self, diagram: &Diagram, patch: DiagramPatch) -> Result<Diagram, Error> {
        let update = DiagramDetailsUpdate {
            title: patch
                .title
                .map_or_else(|| diagram.title.clone(), |title| title.as_ref().to_owned()),
            description: patch
                .description
                .unwrap_or_else(|| diagram.description.clone()),
            updated_at: self.now(),
        };
        self.diagrams
            .update_details(&diagram.id, &update)
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(not_found)
    }

    /// Remove the row, then best-effort remove its snapshot.
    ///
    /// Blob failures are logged and never reach the caller.
    pub async fn delete(&self, diagram: &Diagram) -> Result<(), Error> {
        let removed = self
            .diagrams
            .delete(&diagram.id)
            .await
            .map_err(map_persistence_error)?;
        if !removed {
            return Err(not_found());
        }
        info!(diagram_id = %diagram.id, "diagram deleted");
        let Some(key) = diagram.image_ref.as_deref() else {
            return Ok(());
        };
        if let Err(error) = self.blobs.delete(key).await {
            warn!(diagram_id = %diagram.id, %error, "snapshot cleanup failed; ignoring");
        }
        Ok(())
    }

    /// Apply a share transition.
    ///
    /// `expires_in_days`: `None` keeps the current expiry, `Some(0)` clears
    /// it, `Some(n)` sets it `n` days from now.
    pub async fn set_share(
        &self,
        diagram: &Diagram,
        action: ShareAction,
        expires_in_days: Option<u32>,
    ) -> Result<Diagram, Error> {
        let now = self.now();
        let mut share = diagram.share.clone();
        match expires_in_days {
            None => {}
            Some(0) => share.expires_at = None,
            Some(days) if days <= SHARE_DAYS_MAX => {
                share.expires_at = Some(now + Duration::days(i64::from(days)));
            }
            Some(_) => {
                return Err(DiagramValidationError::ShareLifetimeOutOfRange {
                    max: SHARE_DAYS_MAX,
                }
                .into());
            }
        }
        let needs_token = match action {
            ShareAction::Enable => {
                share.enabled = true;
                share.token.is_none()
            }
            ShareAction::Disable => {
                share.enabled = false;
                false
            }
            ShareAction::Rotate => true,
        };
        if !needs_token {
            return self.write_share(diagram, &share, now).await;
        }
        for _ in 0..TOKEN_ATTEMPTS {
            share.token = Some(ShareToken::generate());
            match self.diagrams.update_share(&diagram.id, &share, now).await {
                Ok(Some(updated)) => {
                    info!(diagram_id = %diagram.id, ?action, "share token issued");
                    return Ok(updated);
                }
                Ok(None) => return Err(not_found()),
                Err(DiagramPersistenceError::ShareTokenConflict) => {
                    warn!(diagram_id = %diagram.id, "share token collision; regenerating");
                }
                Err(error) => return Err(map_persistence_error(error)),
            }
        }
        Err(map_persistence_error(
            DiagramPersistenceError::share_token_conflict(),
        ))
    }

    async fn write_share(
        &self,
        diagram: &Diagram,
        share: &ShareState,
        now: DateTime<Utc>,
    ) -> Result<Diagram, Error> {
        self.diagrams
            .update_share(&diagram.id, share, now)
            .await
            .map_err(map_persistence_error)?
            .ok_or_else(not_found)
    }

    /// Load the snapshot blob, if one was recorded and still exists.
    pub async fn load_image(&self, diagram: &Diagram) -> Result<Option<Blob>, Error> {
        let Some(key) = diagram.image_ref.as_deref() else {
            return Ok(None);
        };
        self.blobs.get(key).await.map_err(map_blob_error)
    }
}

#[cfg(test)]
#[path = "diagram_service_tests.rs"]
mod tests;
