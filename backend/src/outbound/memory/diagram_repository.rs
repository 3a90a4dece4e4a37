//! In-memory diagram repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::ports::{DiagramDetailsUpdate, DiagramPersistenceError, DiagramRepository};
use crate::domain::{Diagram, DiagramId, ShareState, ShareToken, UserId};

/// Diagrams keyed by id. Share-token uniqueness is checked under the write
/// lock, mirroring the unique index of the SQL schema.
#[derive(Debug, Default)]
pub struct InMemoryDiagramRepository {
    diagrams: RwLock<HashMap<DiagramId, Diagram>>,
}

impl InMemoryDiagramRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn token_taken(
    diagrams: &HashMap<DiagramId, Diagram>,
    owner: &DiagramId,
    token: Option<&ShareToken>,
) -> bool {
    let Some(token) = token else {
        return false;
    };
    diagrams
        .values()
        .any(|other| other.id != *owner && other.share.matches(token))
}

#[async_trait]
impl DiagramRepository for InMemoryDiagramRepository {
    async fn insert(&self, diagram: &Diagram) -> Result<(), DiagramPersistenceError> {
        let mut diagrams = self.diagrams.write().await;
        if diagrams.contains_key(&diagram.id) {
            return Err(DiagramPersistenceError::query(format!(
                "duplicate diagram id {}",
                diagram.id
            )));
        }
        if token_taken(&diagrams, &diagram.id, diagram.share.token.as_ref()) {
            return Err(DiagramPersistenceError::share_token_conflict());
        }
        diagrams.insert(diagram.id, diagram.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &DiagramId) -> Result<Option<Diagram>, DiagramPersistenceError> {
        Ok(self.diagrams.read().await.get(id).cloned())
    }

    async fn find_by_share_token(
        &self,
        token: &ShareToken,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        Ok(self
            .diagrams
            .read()
            .await
            .values()
            .find(|diagram| diagram.share.matches(token))
            .cloned())
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        limit: usize,
    ) -> Result<Vec<Diagram>, DiagramPersistenceError> {
        let diagrams = self.diagrams.read().await;
        let mut owned: Vec<Diagram> = diagrams
            .values()
            .filter(|diagram| diagram.is_owned_by(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn update_details(
        &self,
        id: &DiagramId,
        update: &DiagramDetailsUpdate,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut diagrams = self.diagrams.write().await;
        Ok(diagrams.get_mut(id).map(|diagram| {
            diagram.title.clone_from(&update.title);
            diagram.description.clone_from(&update.description);
            diagram.updated_at = update.updated_at;
            diagram.clone()
        }))
    }

    async fn update_share(
        &self,
        id: &DiagramId,
        share: &ShareState,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut diagrams = self.diagrams.write().await;
        if token_taken(&diagrams, id, share.token.as_ref()) {
            return Err(DiagramPersistenceError::share_token_conflict());
        }
        Ok(diagrams.get_mut(id).map(|diagram| {
            diagram.share = share.clone();
            diagram.updated_at = updated_at;
            diagram.clone()
        }))
    }

    async fn set_image_ref(
        &self,
        id: &DiagramId,
        image_ref: &str,
    ) -> Result<bool, DiagramPersistenceError> {
        let mut diagrams = self.diagrams.write().await;
        Ok(diagrams
            .get_mut(id)
            .map(|diagram| diagram.image_ref = Some(image_ref.to_owned()))
            .is_some())
    }

    async fn delete(&self, id: &DiagramId) -> Result<bool, DiagramPersistenceError> {
        Ok(self.diagrams.write().await.remove(id).is_some())
    }
}
