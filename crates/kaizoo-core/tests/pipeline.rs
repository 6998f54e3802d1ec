//! Integration tests for the authenticated request pipeline.
//!
//! Covers bearer attachment, single-flight refresh on 401, the one-retry
//! limit and the error mapping.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use fixtures::{
    can_bind_localhost, dead_base_url, harness, harness_with_timeout, profile_body, token_pair,
    unauthorized,
};
use kaizoo_core::flags::DeviceFlags;
use kaizoo_core::services::ProfileService;
use kaizoo_core::storage::KeyValueStore;
use kaizoo_core::{ApiErrorKind, ApiRequest};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

macro_rules! skip_without_localhost {
    () => {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
    };
}

#[tokio::test]
async fn test_attaches_bearer_token() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("access-1"), Some("refresh-1"));
    let response = h.client.send(ApiRequest::get("/profile")).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_no_token_sends_no_authorization_header() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/challenges"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!([]))
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), None, None);
    h.client.send(ApiRequest::get("/challenges")).await.unwrap();
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(token_pair("fresh", "r2"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("expired"), Some("r1"));
    let flags = DeviceFlags::new(Arc::clone(&h.store) as Arc<dyn KeyValueStore>);
    let profiles = ProfileService::new(Arc::clone(&h.client), flags);

    let profile = profiles.get().await.unwrap();
    assert_eq!(profile.display_name.as_deref(), Some("Ana"));
    assert_eq!(h.stored_access().as_deref(), Some("fresh"));
    assert_eq!(h.stored_refresh().as_deref(), Some("r2"));
    assert_eq!(h.credentials.clears(), 0);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(token_pair("fresh", "r2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("expired"), Some("r1"));
    let (a, b) = tokio::join!(
        h.client.send(ApiRequest::get("/activities")),
        h.client.send(ApiRequest::get("/challenges")),
    );

    assert_eq!(a.unwrap().status, 200);
    assert_eq!(b.unwrap().status, 200);
    assert_eq!(h.stored_access().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_retry_happens_at_most_once() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(token_pair("fresh", "r2"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("expired"), Some("r1"));
    let err = h.client.send(ApiRequest::get("/profile")).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Unauthorized);
    assert_eq!(err.status, Some(401));
    // The refreshed pair is kept; only a failed refresh ends the session.
    assert_eq!(h.stored_access().as_deref(), Some("fresh"));
    assert_eq!(h.credentials.clears(), 0);
}

#[tokio::test]
async fn test_refresh_failure_clears_once_and_fails_all_waiters() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "refresh token revoked" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("expired"), Some("revoked"));
    let (a, b) = tokio::join!(
        h.client.send(ApiRequest::get("/profile")),
        h.client.send(ApiRequest::get("/activities")),
    );

    assert_eq!(a.unwrap_err().kind, ApiErrorKind::Unauthorized);
    assert_eq!(b.unwrap_err().kind, ApiErrorKind::Unauthorized);
    assert_eq!(h.credentials.clears(), 1);
    assert!(h.stored_access().is_none());
    assert!(h.stored_refresh().is_none());
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_refresh_call() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(token_pair("never", "never"))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("expired"), None);
    let (a, b) = tokio::join!(
        h.client.send(ApiRequest::get("/profile")),
        h.client.send(ApiRequest::get("/activities")),
    );

    assert_eq!(a.unwrap_err().kind, ApiErrorKind::Unauthorized);
    assert_eq!(b.unwrap_err().kind, ApiErrorKind::Unauthorized);
    assert_eq!(h.credentials.clears(), 1);
    assert!(h.stored_access().is_none());
}

#[tokio::test]
async fn test_credential_endpoints_are_never_refreshed() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid email or password"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(token_pair("fresh", "r2"))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("old"), Some("r1"));
    let request = ApiRequest::post("/auth/login")
        .json(json!({ "email": "ana@example.com", "password": "wrong" }))
        .no_refresh();
    let err = h.client.send(request).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Unauthorized);
    assert_eq!(err.message, "Invalid email or password");
    assert_eq!(h.stored_access().as_deref(), Some("old"));
}

#[tokio::test]
async fn test_validation_fields_kept_verbatim() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Invalid activity",
            "errors": { "durationMinutes": ["must be greater than 0"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let err = h
        .client
        .send(ApiRequest::post("/activities").json(json!({ "kind": "run" })))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Validation);
    assert_eq!(err.status, Some(422));
    assert_eq!(err.message, "Invalid activity");
    assert_eq!(
        err.fields["durationMinutes"],
        vec!["must be greater than 0".to_string()]
    );
}

#[tokio::test]
async fn test_server_error_is_generic_and_not_retried() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let err = h.client.send(ApiRequest::get("/profile")).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Server);
    assert_eq!(err.status, Some(503));
    assert_eq!(err.details.as_deref(), Some("upstream down"));
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_body())
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness_with_timeout(
        &server.uri(),
        Some("a"),
        Some("r"),
        Some(Duration::from_millis(200)),
    );
    let err = h.client.send(ApiRequest::get("/profile")).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Timeout);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    skip_without_localhost!();
    let h = harness(&dead_base_url(), Some("a"), Some("r"));
    let err = h.client.send(ApiRequest::get("/profile")).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Network);
    assert!(err.details.is_some());
    assert_eq!(h.credentials.clears(), 0);
    assert_eq!(h.stored_access().as_deref(), Some("a"));
}

#[tokio::test]
async fn test_malformed_success_body_is_parse_error() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let err = h
        .client
        .send_json::<serde_json::Value>(ApiRequest::get("/profile"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Parse);
}
