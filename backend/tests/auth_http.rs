//! Login, session, and logout flow against the static identity provider.

mod support;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::test as actix_test;
use renderboard::inbound::http::session::{OAUTH_STATE_COOKIE, SESSION_COOKIE};
use renderboard::test_support::{GOOD_CODE, MemoryHarness, default_memory_http_state};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use support::{ada, ada_identity, session_for, test_app};

#[fixture]
fn harness() -> MemoryHarness {
    default_memory_http_state(ada_identity())
}

fn location(response: &actix_web::dev::ServiceResponse) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_owned()
}

fn response_cookie(
    response: &actix_web::dev::ServiceResponse,
    name: &str,
) -> Option<Cookie<'static>> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(Cookie::into_owned)
}

#[rstest]
#[actix_web::test]
async fn login_round_trip_establishes_a_session(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let login = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/auth/google/login")
            .to_request(),
    )
    .await;
    assert_eq!(login.status(), StatusCode::FOUND);
    let state_cookie = response_cookie(&login, OAUTH_STATE_COOKIE).expect("state cookie");
    assert_eq!(
        location(&login),
        format!("https://idp.test/authorize?state={}", state_cookie.value())
    );
    assert_eq!(state_cookie.http_only(), Some(true));

    let callback = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!(
                "/auth/google/callback?code={GOOD_CODE}&state={}",
                state_cookie.value()
            ))
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, state_cookie.value().to_owned()))
            .to_request(),
    )
    .await;
    assert_eq!(callback.status(), StatusCode::FOUND);
    assert_eq!(location(&callback), "/");
    let session = response_cookie(&callback, SESSION_COOKIE).expect("session cookie");
    assert_eq!(session.http_only(), Some(true));
    let cleared_state = response_cookie(&callback, OAUTH_STATE_COOKIE).expect("state removal");
    assert_eq!(cleared_state.value(), "");

    let me = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/auth/me")
            .cookie(Cookie::new(SESSION_COOKIE, session.value().to_owned()))
            .to_request(),
    )
    .await;
    assert_eq!(me.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(me).await;
    assert_eq!(body["user"]["id"], json!("1098"));
    assert_eq!(body["user"]["provider"], json!("google"));
    assert_eq!(body["user"]["name"], json!("Ada Lovelace"));
}

#[rstest]
#[case::mismatched_state(Some("expected-state"), "other-state", StatusCode::BAD_REQUEST)]
#[case::missing_state_cookie(None, "some-state", StatusCode::BAD_REQUEST)]
#[actix_web::test]
async fn callback_rejects_unverified_state(
    harness: MemoryHarness,
    #[case] cookie_state: Option<&str>,
    #[case] presented: &str,
    #[case] expected: StatusCode,
) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let mut request = actix_test::TestRequest::get().uri(&format!(
        "/auth/google/callback?code={GOOD_CODE}&state={presented}"
    ));
    if let Some(value) = cookie_state {
        request = request.cookie(Cookie::new(OAUTH_STATE_COOKIE, value.to_owned()));
    }

    let response = actix_test::call_service(&app, request.to_request()).await;
    assert_eq!(response.status(), expected);
    assert!(response_cookie(&response, SESSION_COOKIE).is_none());
}

#[rstest]
#[actix_web::test]
async fn rejected_codes_and_provider_errors_are_unauthorised(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let bad_code = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/auth/google/callback?code=stale&state=s1")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "s1"))
            .to_request(),
    )
    .await;
    assert_eq!(bad_code.status(), StatusCode::UNAUTHORIZED);

    let denied = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/auth/google/callback?error=access_denied&state=s1")
            .cookie(Cookie::new(OAUTH_STATE_COOKIE, "s1"))
            .to_request(),
    )
    .await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case::no_cookie(None)]
#[case::tampered(Some("eyJpZCI6IjEwOTgifQ.forged-signature"))]
#[case::garbage(Some("not a token"))]
#[actix_web::test]
async fn anonymous_callers_see_a_null_user(harness: MemoryHarness, #[case] cookie: Option<&str>) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let mut request = actix_test::TestRequest::get().uri("/auth/me");
    if let Some(value) = cookie {
        request = request.cookie(Cookie::new(SESSION_COOKIE, value.to_owned()));
    }

    let response = actix_test::call_service(&app, request.to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body, json!({"user": null}));
}

#[rstest]
#[actix_web::test]
async fn logout_clears_the_session_cookie(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/auth/logout")
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response_cookie(&response, SESSION_COOKIE).expect("removal cookie");
    assert_eq!(cleared.value(), "");
    assert_eq!(
        cleared.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );
}
