//! Diagram aggregate and its share state.
//!
//! ## Invariants
//! - `id` is generated at creation and never changes.
//! - A share token, once issued, stays attached to its diagram until an
//!   explicit rotation replaces it. Tokens carry 256 bits of OS entropy and
//!   are unique across diagrams (enforced by the repository).
//! - A share is active iff it is enabled and not past its expiry.
//! - Guest diagrams (`owner_id == None`) are private and never mutated after
//!   creation except for their snapshot reference.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::Error;
use super::user::UserId;

/// Maximum title length in characters.
pub const TITLE_MAX: usize = 120;
/// Maximum description length in characters.
pub const DESCRIPTION_MAX: usize = 1_000;
/// Maximum code payload size in bytes.
pub const CODE_MAX_BYTES: usize = 256 * 1024;
/// Title used when the caller leaves it blank.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Maximum snapshot image size in bytes.
pub const IMAGE_MAX_BYTES: usize = 2 * 1024 * 1024;
/// Media type of stored snapshots.
pub const SNAPSHOT_CONTENT_TYPE: &str = "image/png";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

const SHARE_TOKEN_BYTES: usize = 32;
/// Encoded length of a share token (32 bytes, unpadded base64url).
pub const SHARE_TOKEN_LEN: usize = 43;

/// Validation failures for diagram inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramValidationError {
    /// Diagram id was not a UUID.
    #[error("diagram id must be a valid UUID")]
    InvalidId,
    /// Title exceeded [`TITLE_MAX`].
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    /// Description exceeded [`DESCRIPTION_MAX`].
    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
    /// Code was empty or whitespace.
    #[error("code must not be empty")]
    EmptyCode,
    /// Code exceeded [`CODE_MAX_BYTES`].
    #[error("code must be at most {max} bytes")]
    CodeTooLarge { max: usize },
    /// Share token was not a 43 character base64url string.
    #[error("share token is malformed")]
    MalformedShareToken,
    /// Snapshot exceeded [`IMAGE_MAX_BYTES`].
    #[error("image must be at most {max} bytes")]
    ImageTooLarge { max: usize },
    /// Snapshot was not a PNG.
    #[error("image must be a PNG")]
    ImageNotPng,
    /// Share lifetime outside `0..=365` days.
    #[error("expiresInDays must be between 0 and {max}")]
    ShareLifetimeOutOfRange { max: u32 },
}

impl From<DiagramValidationError> for Error {
    fn from(err: DiagramValidationError) -> Self {
        match err {
            DiagramValidationError::InvalidId => Error::not_found("diagram not found"),
            DiagramValidationError::MalformedShareToken => Error::not_found("share not found"),
            DiagramValidationError::CodeTooLarge { .. }
            | DiagramValidationError::ImageTooLarge { .. } => {
                Error::payload_too_large(err.to_string())
            }
            DiagramValidationError::TitleTooLong { .. }
            | DiagramValidationError::DescriptionTooLong { .. }
            | DiagramValidationError::EmptyCode
            | DiagramValidationError::ImageNotPng
            | DiagramValidationError::ShareLifetimeOutOfRange { .. } => {
                Error::invalid_request(err.to_string())
            }
        }
    }
}

/// Globally unique diagram identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(Uuid);

impl DiagramId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. one read back from storage.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identifier from a path segment.
    pub fn parse(raw: &str) -> Result<Self, DiagramValidationError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| DiagramValidationError::InvalidId)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the diagram's code is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiagramMode {
    /// Static HTML markup.
    #[serde(alias = "html")]
    Markup,
    /// Script (component) source transpiled in the browser.
    #[serde(alias = "react")]
    Script,
}

impl DiagramMode {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Script => "script",
        }
    }

    /// Parse the storage representation (aliases included).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "markup" | "html" => Some(Self::Markup),
            "script" | "react" => Some(Self::Script),
            _ => None,
        }
    }
}

/// Length-capped title; blank input becomes [`DEFAULT_TITLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramTitle(String);

impl DiagramTitle {
    /// Trim and validate a title.
    pub fn new(raw: Option<&str>) -> Result<Self, DiagramValidationError> {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Ok(Self(DEFAULT_TITLE.to_owned()));
        }
        if trimmed.chars().count() > TITLE_MAX {
            return Err(DiagramValidationError::TitleTooLong { max: TITLE_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DiagramTitle {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Validate an optional description; blank input clears it.
pub fn validate_description(raw: Option<&str>) -> Result<Option<String>, DiagramValidationError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > DESCRIPTION_MAX {
        return Err(DiagramValidationError::DescriptionTooLong {
            max: DESCRIPTION_MAX,
        });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Size-capped source payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramCode(String);

impl DiagramCode {
    /// Validate the payload size. Content is stored verbatim.
    pub fn new(raw: String) -> Result<Self, DiagramValidationError> {
        if raw.trim().is_empty() {
            return Err(DiagramValidationError::EmptyCode);
        }
        if raw.len() > CODE_MAX_BYTES {
            return Err(DiagramValidationError::CodeTooLarge {
                max: CODE_MAX_BYTES,
            });
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for DiagramCode {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Opaque, unguessable capability granting read access to one diagram.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShareToken(String);

impl ShareToken {
    /// Draw a fresh token from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; SHARE_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept only structurally valid tokens.
    ///
    /// # Examples
    /// ```
    /// use renderboard::domain::ShareToken;
    ///
    /// let token = ShareToken::generate();
    /// assert_eq!(ShareToken::parse(token.as_ref()).unwrap(), token);
    /// assert!(ShareToken::parse("short").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, DiagramValidationError> {
        let well_formed = raw.len() == SHARE_TOKEN_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !well_formed {
            return Err(DiagramValidationError::MalformedShareToken);
        }
        Ok(Self(raw.to_owned()))
    }
}

impl AsRef<str> for ShareToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareToken(..)")
    }
}

/// Decoded snapshot image, size-capped and PNG-only.
#[derive(Clone, PartialEq, Eq)]
pub struct SnapshotImage(Vec<u8>);

impl SnapshotImage {
    /// Validate raw image bytes.
    pub fn new(bytes: Vec<u8>) -> Result<Self, DiagramValidationError> {
        if bytes.len() > IMAGE_MAX_BYTES {
            return Err(DiagramValidationError::ImageTooLarge {
                max: IMAGE_MAX_BYTES,
            });
        }
        if !bytes.starts_with(&PNG_SIGNATURE) {
            return Err(DiagramValidationError::ImageNotPng);
        }
        Ok(Self(bytes))
    }

    /// Blob key for a diagram's snapshot.
    pub fn key_for(id: &DiagramId) -> String {
        format!("og/{id}.png")
    }

    /// Consume the image, yielding its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for SnapshotImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotImage({} bytes)", self.0.len())
    }
}

/// Owner-requested share transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShareAction {
    /// Switch link access on, issuing a token if none exists.
    Enable,
    /// Switch link access off, keeping the token.
    Disable,
    /// Replace the token; the enabled flag is untouched.
    Rotate,
}

/// Whether a resolved share link is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    /// Enabled and unexpired.
    Active,
    /// Disabled or past its expiry.
    Expired,
}

/// Share configuration of a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShareState {
    /// Whether link access is switched on.
    pub enabled: bool,
    /// Token issued on first enable; kept across disable/enable.
    pub token: Option<ShareToken>,
    /// Absolute expiry; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareState {
    /// A share is active iff enabled and not yet expired.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use renderboard::domain::{ShareState, ShareToken};
    ///
    /// let now = Utc::now();
    /// let share = ShareState {
    ///     enabled: true,
    ///     token: Some(ShareToken::generate()),
    ///     expires_at: Some(now + Duration::days(1)),
    /// };
    /// assert!(share.is_active(now));
    /// assert!(!share.is_active(now + Duration::days(2)));
    /// ```
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.expires_at.is_none_or(|expiry| expiry > now)
    }

    /// True when `candidate` is this diagram's token, compared in constant
    /// time.
    pub fn matches(&self, candidate: &ShareToken) -> bool {
        self.token.as_ref().is_some_and(|token| {
            token
                .as_ref()
                .as_bytes()
                .ct_eq(candidate.as_ref().as_bytes())
                .into()
        })
    }
}

/// Validated creation input.
#[derive(Debug, Clone)]
pub struct DiagramDraft {
    /// Display title.
    pub title: DiagramTitle,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Rendering mode.
    pub mode: DiagramMode,
    /// Source payload.
    pub code: DiagramCode,
    /// Requested privacy; ignored (forced private) for guests.
    pub is_private: bool,
}

/// Owner-editable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct DiagramPatch {
    /// New title.
    pub title: Option<DiagramTitle>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

/// Persisted diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    /// Immutable identifier.
    pub id: DiagramId,
    /// Owner; `None` for guest-created diagrams.
    pub owner_id: Option<UserId>,
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Rendering mode.
    pub mode: DiagramMode,
    /// Source payload.
    pub code: String,
    /// Private diagrams need ownership or an active share to read.
    pub is_private: bool,
    /// Blob key of the snapshot image, once uploaded.
    pub image_ref: Option<String>,
    /// Share link state.
    pub share: ShareState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Diagram {
    /// Guest diagrams have no owner and cannot be mutated by anyone.
    pub fn is_guest(&self) -> bool {
        self.owner_id.is_none()
    }

    /// True when `user_id` owns this diagram.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user_id)
    }
}
