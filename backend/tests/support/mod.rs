//! Shared helpers for the HTTP integration tests.
//!
//! Each test crate wires the real route table to in-memory adapters through
//! [`renderboard::test_support::memory_http_state`].

#![allow(dead_code, reason = "each test crate uses a different subset")]

use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use renderboard::Trace;
use renderboard::domain::ports::ExternalIdentity;
use renderboard::domain::{User, UserId};
use renderboard::inbound::http::configure;
use renderboard::inbound::http::health::HealthState;
use renderboard::inbound::http::session::SESSION_COOKIE;
use renderboard::inbound::http::state::HttpState;
use renderboard::test_support::MemoryHarness;
use serde_json::{Value, json};

pub const PUBLIC_BASE_URL: &str = "https://board.test";

pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HealthState::new()))
        .app_data(web::Data::new(state))
        .wrap(Trace)
        .configure(configure)
}

/// Identity the static provider asserts on a good code.
pub fn ada_identity() -> ExternalIdentity {
    ExternalIdentity {
        subject: "1098".to_owned(),
        email: Some("ada@example.com".to_owned()),
        name: Some("Ada Lovelace".to_owned()),
        picture: None,
    }
}

pub fn user(id: &str, name: &str) -> User {
    User::try_new(UserId::new(id).expect("valid user id"), "google")
        .expect("valid user")
        .with_name(Some(name.to_owned()))
}

pub fn ada() -> User {
    user("1098", "Ada Lovelace")
}

pub fn bob() -> User {
    user("2001", "Bob")
}

/// Signed session cookie for `user`.
pub fn session_for(harness: &MemoryHarness, user: &User) -> Cookie<'static> {
    let token = harness.sessions.encode(user).expect("session encodes");
    Cookie::new(SESSION_COOKIE, token)
}

pub fn diagram_body(title: &str) -> Value {
    json!({
        "title": title,
        "mode": "markup",
        "code": "<main><h1>Hello</h1></main>",
    })
}

/// Body carrying a minimal PNG snapshot as a data URL.
pub fn diagram_body_with_image(title: &str) -> Value {
    let mut body = diagram_body(title);
    body["image"] = Value::String(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png_bytes())
    ));
    body
}

pub fn png_bytes() -> Vec<u8> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend_from_slice(b"snapshot-bytes");
    png
}

pub fn str_field<'a>(body: &'a Value, pointer: &str) -> &'a str {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string at {pointer} in {body}"))
}
