//! End-to-end coverage of guest publishing, share links, and owner-only
//! mutation over the in-memory adapter set.

mod support;

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::test as actix_test;
use async_trait::async_trait;
use chrono::TimeDelta;
use renderboard::domain::GuestLimits;
use renderboard::domain::LOGIN_URL;
use renderboard::domain::ports::{Blob, BlobStore, BlobStoreError};
use renderboard::outbound::memory::InMemoryBlobStore;
use renderboard::test_support::{
    MemoryHarness, default_memory_http_state, fixture_instant, memory_http_state,
};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use support::{
    PUBLIC_BASE_URL, ada, ada_identity, bob, diagram_body, diagram_body_with_image, png_bytes,
    session_for, str_field, test_app,
};

/// Accepts writes but refuses to delete, like a bucket with a broken policy.
#[derive(Default)]
struct UndeletableBlobStore {
    inner: InMemoryBlobStore,
}

#[async_trait]
impl BlobStore for UndeletableBlobStore {
    async fn put(&self, key: &str, blob: Blob) -> Result<(), BlobStoreError> {
        self.inner.put(key, blob).await
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobStoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, _key: &str) -> Result<(), BlobStoreError> {
        Err(BlobStoreError::io("delete denied"))
    }
}

#[fixture]
fn harness() -> MemoryHarness {
    default_memory_http_state(ada_identity())
}

#[rstest]
#[actix_web::test]
async fn guest_share_resolves_for_anonymous_visitors(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let created = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .set_json(diagram_body("Guest flow"))
            .to_request(),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(created).await;
    let id = str_field(&created, "/id").to_owned();
    let token = str_field(&created, "/share/token").to_owned();
    assert_eq!(created["share"]["enabled"], json!(true));
    assert_eq!(
        str_field(&created, "/share/url"),
        format!("{PUBLIC_BASE_URL}/share/{token}")
    );
    assert_eq!(
        created["share"]["expiresAt"],
        json!((fixture_instant() + TimeDelta::days(3)).timestamp())
    );
    assert_eq!(str_field(&created, "/url"), format!("{PUBLIC_BASE_URL}/d/{id}"));

    let shared = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/share/{token}"))
            .to_request(),
    )
    .await;
    assert_eq!(shared.status(), StatusCode::OK);
    let shared: Value = actix_test::read_body_json(shared).await;
    assert_eq!(shared["status"], json!("active"));
    assert_eq!(shared["diagram"]["ownerId"], Value::Null);
    assert_eq!(shared["diagram"]["isPrivate"], json!(true));
    assert!(shared["diagram"].get("shareToken").is_none());

    let without_token = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(without_token.status(), StatusCode::FORBIDDEN);

    let with_token = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}?token={token}"))
            .to_request(),
    )
    .await;
    assert_eq!(with_token.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn unknown_share_tokens_are_not_found(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let well_formed = format!("/api/share/{}", "A".repeat(43));
    for uri in ["/api/share/not-a-token", well_formed.as_str()] {
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[rstest]
#[actix_web::test]
async fn guest_publishing_is_rate_limited_per_client() {
    let harness = memory_http_state(
        Arc::new(InMemoryBlobStore::new()),
        GuestLimits {
            per_minute: 2,
            per_day: 50,
        },
        ada_identity(),
    );
    let app = actix_test::init_service(test_app(
        harness.state.clone().with_trusted_cdn_header(true),
    ))
    .await;
    let publish = |ip: &'static str| {
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .insert_header(("CF-Connecting-IP", ip))
            .set_json(diagram_body("Burst"))
            .to_request()
    };

    for _ in 0..2 {
        let response = actix_test::call_service(&app, publish("203.0.113.7")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let limited = actix_test::call_service(&app, publish("203.0.113.7")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = actix_test::read_body_json(limited).await;
    assert_eq!(body["code"], json!("rate_limited"));

    let other_client = actix_test::call_service(&app, publish("198.51.100.4")).await;
    assert_eq!(other_client.status(), StatusCode::CREATED);

    harness.clock.advance_seconds(60);
    let next_window = actix_test::call_service(&app, publish("203.0.113.7")).await;
    assert_eq!(next_window.status(), StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn untrusted_cdn_header_cannot_mint_fresh_buckets() {
    let harness = memory_http_state(
        Arc::new(InMemoryBlobStore::new()),
        GuestLimits {
            per_minute: 5,
            per_day: 2,
        },
        ada_identity(),
    );
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let publish = |ip: &'static str| {
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .peer_addr("198.51.100.1:40000".parse().expect("socket addr"))
            .insert_header(("CF-Connecting-IP", ip))
            .set_json(diagram_body("Rotating"))
            .to_request()
    };

    let statuses = [
        actix_test::call_service(&app, publish("203.0.113.1")).await.status(),
        actix_test::call_service(&app, publish("203.0.113.2")).await.status(),
        actix_test::call_service(&app, publish("203.0.113.3")).await.status(),
    ];
    assert_eq!(
        statuses,
        [
            StatusCode::CREATED,
            StatusCode::CREATED,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[rstest]
#[actix_web::test]
async fn invalid_guest_input_does_not_consume_quota() {
    let harness = memory_http_state(
        Arc::new(InMemoryBlobStore::new()),
        GuestLimits {
            per_minute: 1,
            per_day: 50,
        },
        ada_identity(),
    );
    let app = actix_test::init_service(test_app(harness.state.clone())).await;

    let invalid = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .set_json(json!({"mode": "markup", "code": ""}))
            .to_request(),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let valid = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .set_json(diagram_body("After a typo"))
            .to_request(),
    )
    .await;
    assert_eq!(valid.status(), StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn expired_shares_need_a_login(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let created = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/diagrams/guest")
            .set_json(diagram_body("Short lived"))
            .to_request(),
    )
    .await;
    let created: Value = actix_test::read_body_json(created).await;
    let id = str_field(&created, "/id").to_owned();
    let token = str_field(&created, "/share/token").to_owned();

    harness.clock.advance_days(4);

    let anonymous = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/share/{token}"))
            .to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: Value = actix_test::read_body_json(anonymous).await;
    assert_eq!(body["code"], json!("unauthorized"));
    assert_eq!(body["details"]["loginUrl"], json!(LOGIN_URL));

    let anonymous_by_id = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}?token={token}"))
            .to_request(),
    )
    .await;
    assert_eq!(anonymous_by_id.status(), StatusCode::UNAUTHORIZED);

    let logged_in = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/share/{token}"))
            .cookie(session_for(&harness, &bob()))
            .to_request(),
    )
    .await;
    assert_eq!(logged_in.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(logged_in).await;
    assert_eq!(body["status"], json!("expired"));
    assert_eq!(str_field(&body, "/diagram/title"), "Short lived");
}

fn create_owned(harness: &MemoryHarness, body: Value) -> actix_test::TestRequest {
    actix_test::TestRequest::post()
        .uri("/api/diagrams")
        .cookie(session_for(harness, &ada()))
        .set_json(body)
}

#[rstest]
#[actix_web::test]
async fn only_the_owner_can_change_a_diagram(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let created = actix_test::call_service(
        &app,
        create_owned(&harness, diagram_body("Mine")).to_request(),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(created).await;
    let id = str_field(&created, "/id").to_owned();
    assert!(created.get("share").is_none());

    let patch = json!({"title": "Stolen"});
    let anonymous = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/diagrams/{id}"))
            .set_json(&patch)
            .to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let stranger = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &bob()))
            .set_json(&patch)
            .to_request(),
    )
    .await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let stranger_share = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/diagrams/{id}/share"))
            .cookie(session_for(&harness, &bob()))
            .set_json(json!({"action": "enable"}))
            .to_request(),
    )
    .await;
    assert_eq!(stranger_share.status(), StatusCode::FORBIDDEN);

    let stranger_delete = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &bob()))
            .to_request(),
    )
    .await;
    assert_eq!(stranger_delete.status(), StatusCode::FORBIDDEN);

    let owner = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &ada()))
            .set_json(json!({"title": "Renamed", "description": "Now with notes"}))
            .to_request(),
    )
    .await;
    assert_eq!(owner.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(owner).await;
    assert_eq!(body["title"], json!("Renamed"));
    assert_eq!(body["description"], json!("Now with notes"));
}

#[rstest]
#[actix_web::test]
async fn disabling_a_share_kills_the_anonymous_link(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let mut body = diagram_body("Public gallery piece");
    body["isPrivate"] = json!(false);
    let created = actix_test::call_service(&app, create_owned(&harness, body).to_request()).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(created).await;
    let id = str_field(&created, "/id").to_owned();

    let share = |action: &'static str| {
        actix_test::TestRequest::post()
            .uri(&format!("/api/diagrams/{id}/share"))
            .cookie(session_for(&harness, &ada()))
            .set_json(json!({ "action": action }))
            .to_request()
    };
    let enabled = actix_test::call_service(&app, share("enable")).await;
    assert_eq!(enabled.status(), StatusCode::OK);
    let enabled: Value = actix_test::read_body_json(enabled).await;
    let token = str_field(&enabled, "/token").to_owned();
    let disabled = actix_test::call_service(&app, share("disable")).await;
    assert_eq!(disabled.status(), StatusCode::OK);

    let anonymous = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/share/{token}"))
            .to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: Value = actix_test::read_body_json(anonymous).await;
    assert_eq!(body["details"]["loginUrl"], json!(LOGIN_URL));
}

#[rstest]
#[actix_web::test]
async fn owner_share_link_admits_token_holders(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let created = actix_test::call_service(
        &app,
        create_owned(&harness, diagram_body("Shared later")).to_request(),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(created).await;
    let id = str_field(&created, "/id").to_owned();

    let enabled = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/diagrams/{id}/share"))
            .cookie(session_for(&harness, &ada()))
            .set_json(json!({"action": "enable", "expiresInDays": 7}))
            .to_request(),
    )
    .await;
    assert_eq!(enabled.status(), StatusCode::OK);
    let enabled: Value = actix_test::read_body_json(enabled).await;
    assert_eq!(enabled["enabled"], json!(true));
    assert_eq!(
        enabled["expiresAt"],
        json!((fixture_instant() + TimeDelta::days(7)).timestamp())
    );
    let token = str_field(&enabled, "/token").to_owned();

    let stranger = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &bob()))
            .to_request(),
    )
    .await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let holder = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}?token={token}"))
            .cookie(session_for(&harness, &bob()))
            .to_request(),
    )
    .await;
    assert_eq!(holder.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(holder).await;
    assert!(body.get("shareToken").is_none());

    let owner = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    let body: Value = actix_test::read_body_json(owner).await;
    assert_eq!(body["shareToken"], json!(token));

    let disabled = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/diagrams/{id}/share"))
            .cookie(session_for(&harness, &ada()))
            .set_json(json!({"action": "disable"}))
            .to_request(),
    )
    .await;
    let disabled: Value = actix_test::read_body_json(disabled).await;
    assert_eq!(disabled["enabled"], json!(false));
    assert_eq!(disabled["token"], json!(token));
}

#[rstest]
#[actix_web::test]
async fn listing_returns_only_the_callers_diagrams(harness: MemoryHarness) {
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    actix_test::call_service(
        &app,
        create_owned(&harness, diagram_body("First")).to_request(),
    )
    .await;
    harness.clock.advance_seconds(5);
    actix_test::call_service(
        &app,
        create_owned(&harness, diagram_body("Second")).to_request(),
    )
    .await;

    let listed = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/diagrams")
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(
        listed
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("no-store")
    );
    let body: Value = actix_test::read_body_json(listed).await;
    let titles: Vec<&str> = body["items"]
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    assert_eq!(titles, ["Second", "First"]);

    let other = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/diagrams")
            .cookie(session_for(&harness, &bob()))
            .to_request(),
    )
    .await;
    let body: Value = actix_test::read_body_json(other).await;
    assert_eq!(body["items"], json!([]));
}

#[rstest]
#[actix_web::test]
async fn delete_survives_snapshot_cleanup_failure() {
    let harness = memory_http_state(
        Arc::new(UndeletableBlobStore::default()),
        GuestLimits::default(),
        ada_identity(),
    );
    let app = actix_test::init_service(test_app(harness.state.clone())).await;
    let created = actix_test::call_service(
        &app,
        create_owned(&harness, diagram_body_with_image("Pictured")).to_request(),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(created).await;
    assert_eq!(created["imageStored"], json!(true));
    let id = str_field(&created, "/id").to_owned();

    let image = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/og/{id}"))
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    assert_eq!(image.status(), StatusCode::OK);
    assert_eq!(
        image
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("private, max-age=300")
    );
    assert_eq!(
        image
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("image/png")
    );
    let bytes = actix_test::read_body(image).await;
    assert_eq!(bytes.as_ref(), png_bytes().as_slice());

    let deleted = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/diagrams/{id}"))
            .cookie(session_for(&harness, &ada()))
            .to_request(),
    )
    .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
