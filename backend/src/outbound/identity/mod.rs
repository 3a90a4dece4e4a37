//! Identity provider adapters.
//!
//! [`GoogleIdentityProvider`] performs the OAuth authorisation-code flow over
//! HTTP. [`DisabledIdentityProvider`] stands in when no client credentials
//! are configured so the login routes answer 503 instead of failing startup.

mod dto;
mod google;

use async_trait::async_trait;

use crate::domain::ports::{ExternalIdentity, IdentityProvider, IdentityProviderError};

pub use google::{GoogleCredentials, GoogleEndpoints, GoogleIdentityProvider};

/// Provider used when OAuth credentials are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, _state: &str) -> Result<String, IdentityProviderError> {
        Err(IdentityProviderError::not_configured())
    }

    async fn exchange_code(&self, _code: &str) -> Result<ExternalIdentity, IdentityProviderError> {
        Err(IdentityProviderError::not_configured())
    }
}
