//! Gallery use cases: policy composed over storage.
//!
//! Every operation takes the caller's resolved session explicitly; nothing is
//! read from ambient request state. The flow is always: rate limit (guest
//! publishing only), load, [`AccessGate`] decision, then storage.

use tracing::info;

use super::access::{AccessGate, ReadGrant};
use super::diagram::{
    Diagram, DiagramDraft, DiagramId, DiagramPatch, ShareAction, ShareStatus, ShareToken,
    SnapshotImage,
};
use super::diagram_service::{DiagramService, SharedDiagram};
use super::error::Error;
use super::ports::Blob;
use super::rate_limit::{GuestLimits, RateLimiter};
use super::user::User;

/// Result of a create call. The diagram exists even when the image did not
/// store.
#[derive(Debug, Clone)]
pub struct CreatedDiagram {
    /// Persisted diagram.
    pub diagram: Diagram,
    /// Whether the optional snapshot was stored.
    pub image_stored: bool,
}

/// Diagram read together with how access was granted.
#[derive(Debug, Clone)]
pub struct ReadDiagram {
    /// The diagram.
    pub diagram: Diagram,
    /// Rule that admitted the read.
    pub grant: ReadGrant,
}

/// Authorised diagram operations.
#[derive(Clone)]
pub struct GalleryService {
    diagrams: DiagramService,
    limiter: RateLimiter,
    guest_limits: GuestLimits,
}

fn require_session(session: Option<&User>) -> Result<&User, Error> {
    session.ok_or_else(|| Error::login_required("login required"))
}

fn parse_token(token: Option<&str>) -> Option<ShareToken> {
    token.and_then(|raw| ShareToken::parse(raw).ok())
}

impl GalleryService {
    /// Compose the service from storage and the guest rate limiter.
    pub fn new(diagrams: DiagramService, limiter: RateLimiter, guest_limits: GuestLimits) -> Self {
        Self {
            diagrams,
            limiter,
            guest_limits,
        }
    }

    /// Underlying storage service.
    pub fn diagrams(&self) -> &DiagramService {
        &self.diagrams
    }

    /// Create a diagram owned by the caller.
    pub async fn create_owned(
        &self,
        session: Option<&User>,
        draft: DiagramDraft,
        image: Option<SnapshotImage>,
    ) -> Result<CreatedDiagram, Error> {
        let user = require_session(session)?;
        let diagram = self.diagrams.create_owned(user.id(), draft).await?;
        self.finish_create(diagram, image).await
    }

    /// Publish an anonymous diagram, subject to the guest rate limits.
    pub async fn create_guest(
        &self,
        client_id: &str,
        draft: DiagramDraft,
        image: Option<SnapshotImage>,
    ) -> Result<CreatedDiagram, Error> {
        if let Some(rule) = self
            .limiter
            .admit(&self.guest_limits.rules(), client_id)
            .await
        {
            info!(bucket = rule.bucket, "guest publish rate limited");
            return Err(Error::rate_limited("too many guest diagrams; try again later"));
        }
        let diagram = self.diagrams.create_guest(draft).await?;
        self.finish_create(diagram, image).await
    }

    async fn finish_create(
        &self,
        diagram: Diagram,
        image: Option<SnapshotImage>,
    ) -> Result<CreatedDiagram, Error> {
        let Some(image) = image else {
            return Ok(CreatedDiagram {
                diagram,
                image_stored: false,
            });
        };
        let image_stored = self.diagrams.attach_image(&diagram.id, image).await;
        let diagram = if image_stored {
            self.diagrams.get(&diagram.id).await?
        } else {
            diagram
        };
        Ok(CreatedDiagram {
            diagram,
            image_stored,
        })
    }

    /// The caller's own diagrams, newest first.
    pub async fn list_owned(
        &self,
        session: Option<&User>,
        limit: usize,
    ) -> Result<Vec<Diagram>, Error> {
        let user = require_session(session)?;
        self.diagrams.list_owned(user.id(), limit).await
    }

    /// Read a diagram by id, optionally presenting a share token.
    ///
    /// Anonymous callers holding the token of an inactive share get a login
    /// hint; any other denial is forbidden.
    pub async fn read(
        &self,
        session: Option<&User>,
        id: &DiagramId,
        token: Option<&str>,
    ) -> Result<ReadDiagram, Error> {
        let diagram = self.diagrams.get(id).await?;
        let token = parse_token(token);
        let now = self.diagrams.now();
        match AccessGate::can_read(session, &diagram, token.as_ref(), now) {
            Some(grant) => Ok(ReadDiagram { diagram, grant }),
            None => {
                let holds_token = token
                    .as_ref()
                    .is_some_and(|candidate| diagram.share.matches(candidate));
                if holds_token && session.is_none() {
                    Err(Error::login_required("this share link has expired; log in to view"))
                } else {
                    Err(Error::forbidden("you do not have access to this diagram"))
                }
            }
        }
    }

    /// Resolve a public share link.
    ///
    /// Unknown or malformed tokens are not found. Inactive shares answer with
    /// a login hint for anonymous callers, even when the diagram itself is
    /// public, and an `expired` status for any logged-in caller.
    pub async fn read_shared(
        &self,
        session: Option<&User>,
        token: &str,
    ) -> Result<SharedDiagram, Error> {
        let token = ShareToken::parse(token)?;
        let shared = self.diagrams.get_by_share_token(&token).await?;
        if shared.status == ShareStatus::Expired && session.is_none() {
            return Err(Error::login_required("this share link has expired; log in to view"));
        }
        let now = self.diagrams.now();
        match AccessGate::can_read(session, &shared.diagram, Some(&token), now) {
            Some(_) => Ok(shared),
            None if shared.status == ShareStatus::Expired => {
                Err(Error::login_required("this share link has expired; log in to view"))
            }
            None => Err(Error::forbidden("you do not have access to this diagram")),
        }
    }

    /// Snapshot image of a readable diagram.
    pub async fn read_image(
        &self,
        session: Option<&User>,
        id: &DiagramId,
        token: Option<&str>,
    ) -> Result<Blob, Error> {
        let ReadDiagram { diagram, .. } = self.read(session, id, token).await?;
        self.diagrams
            .load_image(&diagram)
            .await?
            .ok_or_else(|| Error::not_found("diagram has no snapshot"))
    }

    async fn load_for_write(
        &self,
        session: Option<&User>,
        id: &DiagramId,
    ) -> Result<Diagram, Error> {
        let user = require_session(session)?;
        let diagram = self.diagrams.get(id).await?;
        if !AccessGate::can_write(Some(user), &diagram) {
            return Err(Error::forbidden("only the owner can modify this diagram"));
        }
        Ok(diagram)
    }

    /// Owner edit of title and description.
    pub async fn update(
        &self,
        session: Option<&User>,
        id: &DiagramId,
        patch: DiagramPatch,
    ) -> Result<Diagram, Error> {
        let diagram = self.load_for_write(session, id).await?;
        self.diagrams.update(&diagram, patch).await
    }

    /// Owner delete; snapshot cleanup is best effort.
    pub async fn delete(&self, session: Option<&User>, id: &DiagramId) -> Result<(), Error> {
        let diagram = self.load_for_write(session, id).await?;
        self.diagrams.delete(&diagram).await
    }

    /// Owner share transition.
    pub async fn share(
        &self,
        session: Option<&User>,
        id: &DiagramId,
        action: ShareAction,
        expires_in_days: Option<u32>,
    ) -> Result<Diagram, Error> {
        let diagram = self.load_for_write(session, id).await?;
        self.diagrams
            .set_share(&diagram, action, expires_in_days)
            .await
    }
}

#[cfg(test)]
#[path = "gallery_tests.rs"]
mod tests;
