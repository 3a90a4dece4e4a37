//! Session cookie extraction and issuance.
//!
//! [`SessionContext`] resolves the signed `session` cookie into an optional
//! [`User`]. A missing, tampered, or stale cookie is anonymous; extraction
//! never fails the request.

use std::future::{Ready, ready};

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use tracing::{debug, error};

use crate::domain::{Error, User};
use crate::inbound::http::state::HttpState;

/// Cookie carrying the signed session assertion.
pub const SESSION_COOKIE: &str = "session";
/// Cookie carrying the OAuth `state` between login and callback.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const SESSION_MAX_AGE_DAYS: i64 = 30;
const OAUTH_STATE_MAX_AGE_MINUTES: i64 = 10;
const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Resolved caller identity for one request.
#[derive(Debug, Clone, Default)]
pub struct SessionContext(Option<User>);

impl SessionContext {
    /// Wrap an already resolved identity.
    pub fn new(user: Option<User>) -> Self {
        Self(user)
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    /// Consume the context.
    pub fn into_user(self) -> Option<User> {
        self.0
    }
}

fn resolve(req: &HttpRequest) -> SessionContext {
    let Some(cookie) = req.cookie(SESSION_COOKIE) else {
        return SessionContext::default();
    };
    let Some(state) = req.app_data::<web::Data<HttpState>>() else {
        error!("HttpState missing from app data; treating request as anonymous");
        return SessionContext::default();
    };
    match state.sessions.decode(cookie.value()) {
        Some(user) => SessionContext::new(Some(user)),
        None => {
            debug!("session cookie failed verification; treating request as anonymous");
            SessionContext::default()
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(resolve(req)))
    }
}

/// Whether cookies for this request should carry the `Secure` attribute.
///
/// Loopback hosts are served over plain HTTP during development.
pub fn is_secure_context(req: &HttpRequest) -> bool {
    let info = req.connection_info();
    !LOOPBACK_HOSTS.contains(&hostname(info.host()))
}

fn hostname(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest
            .split_once(']')
            .map_or(host, |(addr, _)| &host[..addr.len() + 2]);
    }
    host.split(':').next().unwrap_or(host)
}

fn base_cookie(req: &HttpRequest, name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(is_secure_context(req))
        .finish()
}

/// Mint a session cookie for `user`.
///
/// # Errors
///
/// Returns an internal error when the user claim cannot be serialised.
pub fn session_cookie(
    req: &HttpRequest,
    state: &HttpState,
    user: &User,
) -> Result<Cookie<'static>, Error> {
    let token = state
        .sessions
        .encode(user)
        .map_err(|err| Error::internal(format!("failed to encode session: {err}")))?;
    let mut cookie = base_cookie(req, SESSION_COOKIE, token);
    cookie.set_max_age(Duration::days(SESSION_MAX_AGE_DAYS));
    Ok(cookie)
}

/// Short-lived cookie remembering the OAuth `state`.
pub fn oauth_state_cookie(req: &HttpRequest, state: &str) -> Cookie<'static> {
    let mut cookie = base_cookie(req, OAUTH_STATE_COOKIE, state.to_owned());
    cookie.set_max_age(Duration::minutes(OAUTH_STATE_MAX_AGE_MINUTES));
    cookie
}

/// Expired cookie that makes the browser drop `name`.
pub fn removal_cookie(req: &HttpRequest, name: &'static str) -> Cookie<'static> {
    let mut cookie = base_cookie(req, name, String::new());
    cookie.set_max_age(Duration::ZERO);
    cookie
}
