//! Wire shapes returned by the Google OAuth endpoints.

use serde::Deserialize;

use crate::domain::ports::ExternalIdentity;

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserInfoDto {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserInfoDto {
    pub(super) fn into_identity(self) -> Option<ExternalIdentity> {
        let subject = self.sub.trim();
        if subject.is_empty() {
            return None;
        }
        Some(ExternalIdentity {
            subject: subject.to_owned(),
            email: self.email,
            name: self.name,
            picture: self.picture,
        })
    }
}
