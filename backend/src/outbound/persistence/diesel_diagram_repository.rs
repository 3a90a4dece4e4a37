//! PostgreSQL-backed `DiagramRepository` implementation using Diesel ORM.
//!
//! Each method is one statement. Share-token uniqueness is enforced by the
//! `diagrams_share_token_key` constraint and surfaced as
//! [`DiagramPersistenceError::ShareTokenConflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{DiagramDetailsUpdate, DiagramPersistenceError, DiagramRepository};
use crate::domain::{Diagram, DiagramId, DiagramMode, ShareState, ShareToken, UserId};

use super::diesel_basic_error_mapping::{
    is_share_token_conflict, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{DiagramDetailsChangeset, DiagramRow, NewDiagramRow, ShareChangeset};
use super::pool::{DbPool, PoolError};
use super::schema::diagrams;

/// Diesel-backed implementation of the `DiagramRepository` port.
#[derive(Clone)]
pub struct DieselDiagramRepository {
    pool: DbPool,
}

impl DieselDiagramRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DiagramPersistenceError {
    map_basic_pool_error(error, DiagramPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> DiagramPersistenceError {
    if is_share_token_conflict(&error) {
        return DiagramPersistenceError::share_token_conflict();
    }
    map_basic_diesel_error(
        error,
        DiagramPersistenceError::query,
        DiagramPersistenceError::connection,
    )
}

fn row_to_diagram(row: DiagramRow) -> Result<Diagram, DiagramPersistenceError> {
    let mode = DiagramMode::parse(&row.mode).ok_or_else(|| {
        DiagramPersistenceError::query(format!(
            "unknown diagram mode {:?} for {}",
            row.mode, row.id
        ))
    })?;
    let owner_id = row
        .owner_id
        .map(UserId::new)
        .transpose()
        .map_err(|err| DiagramPersistenceError::query(format!("invalid stored owner id: {err}")))?;
    let token = row
        .share_token
        .as_deref()
        .map(ShareToken::parse)
        .transpose()
        .map_err(|err| {
            DiagramPersistenceError::query(format!("invalid stored share token: {err}"))
        })?;
    Ok(Diagram {
        id: DiagramId::from_uuid(row.id),
        owner_id,
        title: row.title,
        description: row.description,
        mode,
        code: row.code,
        is_private: row.is_private,
        image_ref: row.image_ref,
        share: ShareState {
            enabled: row.share_enabled,
            token,
            expires_at: row.share_expires_at,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl DiagramRepository for DieselDiagramRepository {
    async fn insert(&self, diagram: &Diagram) -> Result<(), DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewDiagramRow {
            id: *diagram.id.as_uuid(),
            owner_id: diagram.owner_id.as_ref().map(AsRef::as_ref),
            title: diagram.title.as_str(),
            description: diagram.description.as_deref(),
            mode: diagram.mode.as_str(),
            code: diagram.code.as_str(),
            is_private: diagram.is_private,
            image_ref: diagram.image_ref.as_deref(),
            share_enabled: diagram.share.enabled,
            share_token: diagram.share.token.as_ref().map(AsRef::as_ref),
            share_expires_at: diagram.share.expires_at,
            created_at: diagram.created_at,
            updated_at: diagram.updated_at,
        };
        diesel::insert_into(diagrams::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &DiagramId) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DiagramRow> = diagrams::table
            .filter(diagrams::id.eq(id.as_uuid()))
            .select(DiagramRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_diagram).transpose()
    }

    async fn find_by_share_token(
        &self,
        token: &ShareToken,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DiagramRow> = diagrams::table
            .filter(diagrams::share_token.eq(token.as_ref()))
            .select(DiagramRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_diagram).transpose()
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        limit: usize,
    ) -> Result<Vec<Diagram>, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<DiagramRow> = diagrams::table
            .filter(diagrams::owner_id.eq(owner.as_ref()))
            .order(diagrams::created_at.desc())
            .limit(limit)
            .select(DiagramRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_diagram).collect()
    }

    async fn update_details(
        &self,
        id: &DiagramId,
        update: &DiagramDetailsUpdate,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = DiagramDetailsChangeset {
            title: update.title.as_str(),
            description: update.description.as_deref(),
            updated_at: update.updated_at,
        };
        let row: Option<DiagramRow> = diesel::update(diagrams::table.find(id.as_uuid()))
            .set(&changeset)
            .returning(DiagramRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_diagram).transpose()
    }

    async fn update_share(
        &self,
        id: &DiagramId,
        share: &ShareState,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Diagram>, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = ShareChangeset {
            share_enabled: share.enabled,
            share_token: share.token.as_ref().map(AsRef::as_ref),
            share_expires_at: share.expires_at,
            updated_at,
        };
        let row: Option<DiagramRow> = diesel::update(diagrams::table.find(id.as_uuid()))
            .set(&changeset)
            .returning(DiagramRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_diagram).transpose()
    }

    async fn set_image_ref(
        &self,
        id: &DiagramId,
        image_ref: &str,
    ) -> Result<bool, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(diagrams::table.find(id.as_uuid()))
            .set(diagrams::image_ref.eq(image_ref))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: &DiagramId) -> Result<bool, DiagramPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(diagrams::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
