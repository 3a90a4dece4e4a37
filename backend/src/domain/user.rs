//! User identity model.
//!
//! A [`User`] is created or refreshed on every successful external login and
//! is never deleted here. Sessions carry a signed copy of the same claim, so
//! this type doubles as the session assertion payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum accepted length of a provider subject identifier.
pub const USER_ID_MAX: usize = 255;

/// Validation errors returned by user constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The identifier was empty or whitespace.
    #[error("user id must not be empty")]
    EmptyId,
    /// The identifier exceeded [`USER_ID_MAX`] characters.
    #[error("user id must be at most {max} characters")]
    IdTooLong { max: usize },
    /// The provider name was empty.
    #[error("identity provider must not be empty")]
    EmptyProvider,
}

/// Stable external identity, typically the provider's subject claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.chars().count() > USER_ID_MAX {
            return Err(UserValidationError::IdTooLong { max: USER_ID_MAX });
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Authenticated user identity.
///
/// ## Invariants
/// - `id` is non-empty and at most [`USER_ID_MAX`] characters.
/// - `provider` is non-empty.
///
/// # Examples
/// ```
/// use renderboard::domain::{User, UserId};
///
/// let user = User::try_new(UserId::new("1234").unwrap(), "google")
///     .unwrap()
///     .with_name(Some("Ada".to_owned()));
/// assert_eq!(user.provider(), "google");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "109876543210987654321")]
    id: UserId,
    #[schema(example = "google")]
    provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<String>,
}

impl User {
    /// Build a user with only the mandatory identity fields.
    pub fn try_new(id: UserId, provider: impl Into<String>) -> Result<Self, UserValidationError> {
        let provider = provider.into();
        if provider.trim().is_empty() {
            return Err(UserValidationError::EmptyProvider);
        }
        Ok(Self {
            id,
            provider,
            email: None,
            name: None,
            picture: None,
        })
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Attach an avatar URL.
    #[must_use]
    pub fn with_picture(mut self, picture: Option<String>) -> Self {
        self.picture = picture;
        self
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Identity provider that asserted this user.
    pub fn provider(&self) -> &str {
        self.provider.as_str()
    }

    /// Email address, if the provider shared one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Display name, if the provider shared one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Avatar URL, if the provider shared one.
    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }
}
