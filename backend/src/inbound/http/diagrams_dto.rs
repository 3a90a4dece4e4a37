//! Request and response bodies for the diagram endpoints.
//!
//! Requests are validated into domain drafts and patches here so handlers
//! only orchestrate. All bodies are camelCase JSON.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Diagram, DiagramCode, DiagramDraft, DiagramMode, DiagramPatch, DiagramTitle, Error,
    IMAGE_MAX_BYTES, ShareAction, ShareStatus, SnapshotImage, User, validate_description,
};

use super::state::HttpState;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/diagrams` and `POST /api/diagrams/guest`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiagramRequest {
    /// Blank or absent becomes "Untitled".
    #[schema(example = "Request lifecycle")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// `markup` or `script` (`html` and `react` are accepted aliases).
    pub mode: DiagramMode,
    #[schema(example = "<h1>Hello</h1>")]
    pub code: String,
    /// Owned diagrams default to private; guests are always private.
    pub is_private: Option<bool>,
    /// Base64 PNG, raw or as a `data:image/png;base64,` URL.
    pub image: Option<String>,
}

impl CreateDiagramRequest {
    /// Validate into a draft plus the optional snapshot.
    ///
    /// # Errors
    ///
    /// `invalid_request` for bad fields, `payload_too_large` for oversized
    /// code or images.
    pub fn into_parts(self) -> Result<(DiagramDraft, Option<SnapshotImage>), Error> {
        let draft = DiagramDraft {
            title: DiagramTitle::new(self.title.as_deref())?,
            description: validate_description(self.description.as_deref())?,
            mode: self.mode,
            code: DiagramCode::new(self.code)?,
            is_private: self.is_private.unwrap_or(true),
        };
        let image = self.image.as_deref().map(decode_image).transpose()?;
        Ok((draft, image))
    }
}

/// Decode a base64 snapshot, rejecting oversized input before decoding.
pub fn decode_image(raw: &str) -> Result<SnapshotImage, Error> {
    let encoded = raw.trim();
    let encoded = encoded.strip_prefix(DATA_URL_PREFIX).unwrap_or(encoded);
    if encoded.starts_with("data:") {
        return Err(Error::invalid_request("image must be a PNG data URL"));
    }
    if encoded.len() / 4 * 3 > IMAGE_MAX_BYTES + 3 {
        return Err(Error::payload_too_large(format!(
            "image must be at most {IMAGE_MAX_BYTES} bytes"
        )));
    }
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|err| Error::invalid_request(format!("image is not valid base64: {err}")))?;
    Ok(SnapshotImage::new(bytes)?)
}

/// Body of `PATCH /api/diagrams/{id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiagramRequest {
    pub title: Option<String>,
    /// Absent leaves the description; `null` or blank clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl TryFrom<UpdateDiagramRequest> for DiagramPatch {
    type Error = Error;

    fn try_from(value: UpdateDiagramRequest) -> Result<Self, Self::Error> {
        let title = value
            .title
            .as_deref()
            .map(|raw| DiagramTitle::new(Some(raw)))
            .transpose()?;
        let description = value
            .description
            .map(|raw| validate_description(raw.as_deref()))
            .transpose()?;
        Ok(Self { title, description })
    }
}

/// Body of `POST /api/diagrams/{id}/share`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub action: ShareAction,
    /// Absent keeps the current expiry, `0` removes it, `1..=365` sets it.
    pub expires_in_days: Option<u32>,
}

/// Query of `GET /api/diagrams`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Page size, clamped to `1..=100`; defaults to 30.
    pub limit: Option<usize>,
}

/// Query carrying an optional share token.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Full diagram as returned to readers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramResponse {
    pub id: String,
    pub owner_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub mode: DiagramMode,
    pub code: String,
    pub is_private: bool,
    pub image_url: Option<String>,
    pub share_enabled: bool,
    /// Unix seconds.
    pub share_expires_at: Option<i64>,
    /// Present for the owner only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiagramResponse {
    /// Render `diagram` for `viewer`; the token is shown to its owner only.
    pub fn for_viewer(diagram: Diagram, viewer: Option<&User>) -> Self {
        let is_owner = viewer.is_some_and(|user| diagram.is_owned_by(user.id()));
        let image_url = diagram
            .image_ref
            .as_ref()
            .map(|_| HttpState::image_url(&diagram.id));
        let share_token = if is_owner {
            diagram.share.token.as_ref().map(|t| t.as_ref().to_owned())
        } else {
            None
        };
        Self {
            id: diagram.id.to_string(),
            owner_id: diagram.owner_id.map(String::from),
            title: diagram.title,
            description: diagram.description,
            mode: diagram.mode,
            code: diagram.code,
            is_private: diagram.is_private,
            image_url,
            share_enabled: diagram.share.enabled,
            share_expires_at: diagram.share.expires_at.map(|at| at.timestamp()),
            share_token,
            created_at: diagram.created_at,
            updated_at: diagram.updated_at,
        }
    }
}

/// List entry; omits the code payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSummary {
    pub id: String,
    pub title: String,
    pub mode: DiagramMode,
    pub is_private: bool,
    pub image_url: Option<String>,
    pub share_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Diagram> for DiagramSummary {
    fn from(diagram: Diagram) -> Self {
        let image_url = diagram
            .image_ref
            .as_ref()
            .map(|_| HttpState::image_url(&diagram.id));
        Self {
            id: diagram.id.to_string(),
            title: diagram.title,
            mode: diagram.mode,
            is_private: diagram.is_private,
            image_url,
            share_enabled: diagram.share.enabled,
            created_at: diagram.created_at,
            updated_at: diagram.updated_at,
        }
    }
}

/// Body of `GET /api/diagrams`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiagramListResponse {
    pub items: Vec<DiagramSummary>,
}

/// Share link details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub enabled: bool,
    pub token: Option<String>,
    pub url: Option<String>,
    /// Unix seconds; `null` never expires.
    pub expires_at: Option<i64>,
}

impl ShareResponse {
    pub fn from_diagram(state: &HttpState, diagram: &Diagram) -> Self {
        let token = diagram.share.token.as_ref();
        Self {
            enabled: diagram.share.enabled,
            token: token.map(|t| t.as_ref().to_owned()),
            url: token.map(|t| state.share_url(t)),
            expires_at: diagram.share.expires_at.map(|at| at.timestamp()),
        }
    }
}

/// Body of a successful create.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiagramResponse {
    pub id: String,
    pub url: String,
    /// False when the snapshot was supplied but could not be stored.
    pub image_stored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareResponse>,
}

/// Body of `GET /api/share/{token}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SharedDiagramResponse {
    pub status: ShareStatus,
    pub diagram: DiagramResponse,
}
