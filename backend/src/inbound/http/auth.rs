//! Login, logout, and current-user handlers.
//!
//! ```text
//! GET  /auth/google/login
//! GET  /auth/google/callback?code=..&state=..
//! POST /auth/logout
//! GET  /auth/me
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, OAuthState, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::session::{
    OAUTH_STATE_COOKIE, SESSION_COOKIE, SessionContext, oauth_state_cookie, removal_cookie,
    session_cookie,
};
use crate::inbound::http::state::HttpState;

/// Query parameters the provider appends to the callback.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CallbackQuery {
    /// Authorisation code.
    pub code: Option<String>,
    /// Echo of the state issued at login.
    pub state: Option<String>,
    /// Set when the user declined consent.
    pub error: Option<String>,
}

/// Body of `GET /auth/me`.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MeResponse {
    /// The session user, or `null` when anonymous.
    pub user: Option<User>,
}

/// Redirect the browser to the identity provider.
#[utoipa::path(
    get,
    path = "/auth/google/login",
    responses(
        (status = 302, description = "Redirect to the provider consent page"),
        (status = 503, description = "Login is not configured", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[get("/auth/google/login")]
pub async fn login(req: HttpRequest, state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let redirect = state.auth.begin_login()?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, redirect.url))
        .cookie(oauth_state_cookie(&req, redirect.state.as_ref()))
        .finish())
}

/// Complete the provider round trip and start a session.
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackQuery),
    responses(
        (
            status = 302,
            description = "Session established",
            headers(("Set-Cookie" = String, description = "Session cookie"))
        ),
        (status = 400, description = "State mismatch or missing code", body = Error),
        (status = 401, description = "Provider rejected the code", body = Error),
        (status = 503, description = "Provider unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "loginCallback",
    security([])
)]
#[get("/auth/google/callback")]
pub async fn callback(
    req: HttpRequest,
    state: web::Data<HttpState>,
    query: web::Query<CallbackQuery>,
) -> ApiResult<HttpResponse> {
    let CallbackQuery { code, state: presented, error } = query.into_inner();
    if let Some(reason) = error {
        return Err(Error::unauthorized(format!("login was not completed: {reason}")));
    }
    let expected = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|cookie| OAuthState::from_cookie(cookie.value()));
    let user = state
        .auth
        .complete_login(
            code.as_deref().unwrap_or_default(),
            presented.as_deref().unwrap_or_default(),
            expected.as_ref(),
        )
        .await?;
    let cookie = session_cookie(&req, &state, &user)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(cookie)
        .cookie(removal_cookie(&req, OAUTH_STATE_COOKIE))
        .finish())
}

/// Drop the session cookie. Sessions are not revoked server-side.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/auth/logout")]
pub async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::NoContent()
        .cookie(removal_cookie(&req, SESSION_COOKIE))
        .finish()
}

/// The caller's session user, if any.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Current user or null", body = MeResponse)),
    tags = ["auth"],
    operation_id = "currentUser",
    security([])
)]
#[get("/auth/me")]
pub async fn me(session: SessionContext) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(no_store_header())
        .json(MeResponse {
            user: session.into_user(),
        })
}
