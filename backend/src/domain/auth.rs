//! External login: OAuth state handling and user upsert.
//!
//! The identity provider is trusted: whatever identity it asserts after a
//! code exchange is upserted and becomes the session claim. No password or
//! credential ever reaches this service.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::error::Error;
use super::ports::{
    ExternalIdentity, IdentityProvider, IdentityProviderError, UserPersistenceError,
    UserRepository,
};
use super::user::{User, UserId};

const STATE_BYTES: usize = 16;

/// Anti-forgery value round-tripped through the provider redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthState(String);

impl OAuthState {
    /// Draw a fresh state value from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; STATE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// True when the callback's `state` equals the stored one, compared in
    /// constant time.
    pub fn matches(&self, presented: &str) -> bool {
        !presented.is_empty() && bool::from(self.0.as_bytes().ct_eq(presented.as_bytes()))
    }

    /// Wrap a previously issued value read back from the client.
    pub fn from_cookie(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for OAuthState {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for OAuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OAuthState(..)")
    }
}

/// Redirect target plus the state that must come back with it.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    /// Provider consent URL.
    pub url: String,
    /// State to persist client-side until the callback.
    pub state: OAuthState,
}

fn map_provider_error(error: IdentityProviderError) -> Error {
    match error {
        IdentityProviderError::NotConfigured => {
            Error::service_unavailable("login is not configured on this server")
        }
        IdentityProviderError::Rejected { message } => {
            warn!(%message, "identity provider rejected the authorisation code");
            Error::unauthorized("login was rejected by the identity provider")
        }
        IdentityProviderError::Transport { message } => {
            warn!(%message, "identity provider request failed");
            Error::service_unavailable("identity provider unavailable")
        }
    }
}

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
    }
}

/// Login use cases over the identity provider and user table.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    /// Create a service over the given collaborators.
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UserRepository>) -> Self {
        Self { provider, users }
    }

    /// Start a login: pick a state and build the consent URL.
    pub fn begin_login(&self) -> Result<LoginRedirect, Error> {
        let state = OAuthState::generate();
        let url = self
            .provider
            .authorization_url(state.as_ref())
            .map_err(map_provider_error)?;
        Ok(LoginRedirect { url, state })
    }

    /// Finish a login: check the state, exchange the code, upsert the user.
    pub async fn complete_login(
        &self,
        code: &str,
        presented_state: &str,
        expected_state: Option<&OAuthState>,
    ) -> Result<User, Error> {
        if !expected_state.is_some_and(|state| state.matches(presented_state)) {
            return Err(Error::invalid_request("login state mismatch"));
        }
        if code.trim().is_empty() {
            return Err(Error::invalid_request("authorisation code is missing"));
        }
        let identity = self
            .provider
            .exchange_code(code)
            .await
            .map_err(map_provider_error)?;
        let user = self.user_from_identity(identity)?;
        self.users.upsert(&user).await.map_err(map_user_error)?;
        info!(user_id = %user.id(), provider = user.provider(), "user logged in");
        Ok(user)
    }

    fn user_from_identity(&self, identity: ExternalIdentity) -> Result<User, Error> {
        let id = UserId::new(identity.subject)
            .map_err(|err| Error::internal(format!("identity provider subject invalid: {err}")))?;
        let user = User::try_new(id, self.provider.name())
            .map_err(|err| Error::internal(format!("identity provider name invalid: {err}")))?;
        Ok(user
            .with_email(identity.email)
            .with_name(identity.name)
            .with_picture(identity.picture))
    }
}
