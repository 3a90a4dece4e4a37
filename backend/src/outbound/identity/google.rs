//! Reqwest-backed Google OAuth adapter.
//!
//! Owns transport only: consent URL construction, the authorisation-code
//! exchange, the userinfo fetch, and HTTP error mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{TokenResponseDto, UserInfoDto};
use crate::domain::ports::{ExternalIdentity, IdentityProvider, IdentityProviderError};

const PROVIDER_NAME: &str = "google";
const SCOPE: &str = "openid email profile";
const CALLBACK_PATH: &str = "/auth/google/callback";
const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// OAuth client registration.
#[derive(Clone)]
pub struct GoogleCredentials {
    /// Public client identifier.
    pub client_id: String,
    /// Client secret, wiped on drop.
    pub client_secret: Zeroizing<String>,
}

/// Endpoint set; overridable for tests and proxies.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize: Url,
    pub token: Url,
    pub userinfo: Url,
}

impl GoogleEndpoints {
    /// Production Google endpoints.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the constants are valid URLs.
    pub fn google() -> Result<Self, url::ParseError> {
        Ok(Self {
            authorize: Url::parse(DEFAULT_AUTHORIZE_URL)?,
            token: Url::parse(DEFAULT_TOKEN_URL)?,
            userinfo: Url::parse(DEFAULT_USERINFO_URL)?,
        })
    }
}

/// Identity provider performing the Google authorisation-code flow.
pub struct GoogleIdentityProvider {
    client: Client,
    credentials: GoogleCredentials,
    endpoints: GoogleEndpoints,
    redirect_uri: String,
}

impl GoogleIdentityProvider {
    /// Build a provider whose callback lives under `public_base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        credentials: GoogleCredentials,
        endpoints: GoogleEndpoints,
        public_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
            endpoints,
            redirect_uri: redirect_uri(public_base_url),
        })
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, IdentityProviderError> {
        let form = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .client
            .post(self.endpoints.token.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let token: TokenResponseDto = serde_json::from_slice(&body).map_err(|err| {
            IdentityProviderError::transport(format!("invalid token response: {err}"))
        })?;
        Ok(token.access_token)
    }

    async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<ExternalIdentity, IdentityProviderError> {
        let response = self
            .client
            .get(self.endpoints.userinfo.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_identity(body.as_ref())
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn authorization_url(&self, state: &str) -> Result<String, IdentityProviderError> {
        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPE)
            .append_pair("state", state)
            .append_pair("prompt", "select_account");
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityProviderError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(IdentityProviderError::rejected("missing authorisation code"));
        }
        let access_token = Zeroizing::new(self.fetch_access_token(code).await?);
        self.fetch_identity(&access_token).await
    }
}

fn redirect_uri(public_base_url: &str) -> String {
    format!("{}{CALLBACK_PATH}", public_base_url.trim_end_matches('/'))
}

fn parse_identity(body: &[u8]) -> Result<ExternalIdentity, IdentityProviderError> {
    let info: UserInfoDto = serde_json::from_slice(body).map_err(|err| {
        IdentityProviderError::transport(format!("invalid userinfo payload: {err}"))
    })?;
    info.into_identity()
        .ok_or_else(|| IdentityProviderError::rejected("userinfo carried no subject"))
}

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    if error.is_timeout() {
        IdentityProviderError::transport(format!("timed out: {error}"))
    } else {
        IdentityProviderError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            IdentityProviderError::rejected(message)
        }
        _ => IdentityProviderError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
