//! Internal Diesel row structs for database operations.
//!
//! These types never leave the persistence layer; repositories convert them
//! to and from domain types.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{diagrams, users};

/// Insertable struct for upserting users.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: &'a str,
    pub provider: &'a str,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub picture: Option<&'a str>,
}

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: String,
    pub provider: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Row struct for reading from the diagrams table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = diagrams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DiagramRow {
    pub id: Uuid,
    pub owner_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub mode: String,
    pub code: String,
    pub is_private: bool,
    pub image_ref: Option<String>,
    pub share_enabled: bool,
    pub share_token: Option<String>,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for new diagrams.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = diagrams)]
pub(crate) struct NewDiagramRow<'a> {
    pub id: Uuid,
    pub owner_id: Option<&'a str>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub mode: &'a str,
    pub code: &'a str,
    pub is_private: bool,
    pub image_ref: Option<&'a str>,
    pub share_enabled: bool,
    pub share_token: Option<&'a str>,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for owner edits. `None` clears the description.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = diagrams)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct DiagramDetailsChangeset<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for share transitions. `None` clears token or expiry.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = diagrams)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ShareChangeset<'a> {
    pub share_enabled: bool,
    pub share_token: Option<&'a str>,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Result row of the atomic counter upsert.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct ConsumedCounterRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub count: i32,
}
