//! Domain primitives, policy, and services.
//!
//! Purpose: define the strongly typed entities, the authorisation policy, and
//! the use cases guarding saved diagrams. The domain depends only on the
//! port traits in [`ports`]; adapters live under `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable codes.
//! - Signer / SessionCodec: keyed signing and session tokens.
//! - User / Diagram / ShareToken: identities and the protected artifact.
//! - AccessGate: pure read/write policy.
//! - RateLimiter: fixed-window guest throttling.
//! - DiagramService / GalleryService / AuthService: use cases.

pub mod access;
pub mod auth;
pub mod diagram;
pub mod diagram_service;
pub mod error;
pub mod gallery;
pub mod ports;
pub mod rate_limit;
pub mod session;
pub mod signer;
pub mod trace_id;
pub mod user;

pub use self::access::{AccessGate, ReadGrant};
pub use self::auth::{AuthService, LoginRedirect, OAuthState};
pub use self::diagram::{
    CODE_MAX_BYTES, DESCRIPTION_MAX, Diagram, DiagramCode, DiagramDraft, DiagramId, DiagramMode,
    DiagramPatch, DiagramTitle, DiagramValidationError, IMAGE_MAX_BYTES, SNAPSHOT_CONTENT_TYPE,
    ShareAction, ShareState, ShareStatus, ShareToken, SnapshotImage, TITLE_MAX,
    validate_description,
};
pub use self::diagram_service::{
    DiagramService, GUEST_SHARE_DAYS, LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX, SHARE_DAYS_MAX,
    SharedDiagram,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError, LOGIN_URL};
pub use self::gallery::{CreatedDiagram, GalleryService, ReadDiagram};
pub use self::rate_limit::{GuestLimits, RateLimitRule, RateLimiter};
pub use self::session::SessionCodec;
pub use self::signer::{SIGNATURE_LEN, Signer, SignerError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{User, UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use renderboard::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
