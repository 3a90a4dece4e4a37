//! Port abstraction for the external OAuth identity provider.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failures talking to the identity provider.
    pub enum IdentityProviderError {
        /// Provider credentials are not configured.
        NotConfigured => "identity provider is not configured",
        /// The provider rejected the authorisation code.
        Rejected { message: String } => "identity provider rejected the code: {message}",
        /// Transport or decoding failure.
        Transport { message: String } => "identity provider request failed: {message}",
    }
}

/// Profile asserted by the provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Provider subject identifier.
    pub subject: String,
    /// Email address, if shared.
    pub email: Option<String>,
    /// Display name, if shared.
    pub name: Option<String>,
    /// Avatar URL, if shared.
    pub picture: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name recorded on users, e.g. `google`.
    fn name(&self) -> &'static str;

    /// Consent URL the browser is redirected to, carrying `state`.
    fn authorization_url(&self, state: &str) -> Result<String, IdentityProviderError>;

    /// Exchange an authorisation code for the caller's identity.
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityProviderError>;
}
