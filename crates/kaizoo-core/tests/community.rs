//! Integration tests for the community feed over HTTP.
//!
//! Optimistic likes and comments against a mock backend, and the seed-data
//! fallback for listings.

mod fixtures;

use std::sync::Arc;

use fixtures::{can_bind_localhost, dead_base_url, harness};
use kaizoo_core::community::{
    Author, CommunityApi, CommunityError, CommunityFeed, FeedSource, RemoteCommunity, SeedReason,
    community_api,
};
use kaizoo_core::config::Config;
use kaizoo_core::{ApiClient, ApiErrorKind};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! skip_without_localhost {
    () => {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
    };
}

fn posts_body() -> Value {
    json!([
        {
            "id": "p1",
            "author": { "id": "u2", "name": "Mira" },
            "text": "Hill repeats today",
            "createdAt": "2026-10-13T07:00:00Z",
            "likes": 5,
            "liked": false,
            "commentsCount": 0
        },
        {
            "id": "p2",
            "author": { "id": "u3", "name": "Theo" },
            "text": "Rest day",
            "createdAt": "2026-10-12T18:00:00Z",
            "likes": 0,
            "liked": true,
            "commentsCount": 0
        }
    ])
}

fn me() -> Author {
    Author {
        id: "u1".into(),
        name: "Ana".into(),
        avatar_url: None,
    }
}

async fn mount_posts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/community/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body()))
        .mount(server)
        .await;
}

fn remote_feed(client: Arc<ApiClient>) -> CommunityFeed {
    CommunityFeed::new(Arc::new(RemoteCommunity::new(client)))
}

fn fallback_config() -> Config {
    let mut config = Config::default();
    config.community.offline_fallback = true;
    config
}

#[tokio::test]
async fn test_like_confirmed_by_backend() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    mount_posts(&server).await;
    Mock::given(method("POST"))
        .and(path("/community/posts/p1/like"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let feed = remote_feed(Arc::clone(&h.client));
    assert_eq!(feed.load().await.unwrap(), FeedSource::Remote);

    let post = feed.toggle_like("p1").await.unwrap();
    assert!(post.liked);
    assert_eq!(post.likes, 6);
}

#[tokio::test]
async fn test_like_rejected_rolls_back() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    mount_posts(&server).await;
    Mock::given(method("POST"))
        .and(path("/community/posts/p1/like"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let feed = remote_feed(Arc::clone(&h.client));
    feed.load().await.unwrap();
    let before = feed.post("p1").unwrap();

    let err = feed.toggle_like("p1").await.unwrap_err();
    assert!(matches!(err, CommunityError::Api(ref e) if e.kind == ApiErrorKind::Server));
    assert_eq!(feed.post("p1").unwrap(), before);
}

#[tokio::test]
async fn test_unlike_at_zero_stays_at_zero() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    mount_posts(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/community/posts/p2/like"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let feed = remote_feed(Arc::clone(&h.client));
    feed.load().await.unwrap();

    let post = feed.toggle_like("p2").await.unwrap();
    assert!(!post.liked);
    assert_eq!(post.likes, 0);
}

#[tokio::test]
async fn test_comment_replaced_by_confirmed_comment() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    mount_posts(&server).await;
    Mock::given(method("POST"))
        .and(path("/community/posts/p1/comments"))
        .and(body_json(json!({ "text": "Strong work" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "c-42",
            "author": { "id": "u1", "name": "Ana" },
            "text": "Strong work",
            "createdAt": "2026-10-13T07:05:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let feed = remote_feed(Arc::clone(&h.client));
    feed.load().await.unwrap();

    let comment = feed.add_comment("p1", me(), "Strong work").await.unwrap();
    let post = feed.post("p1").unwrap();
    assert_eq!(comment.id, "c-42");
    assert_eq!(post.comments_count, 1);
    assert_eq!(post.comments, vec![comment]);
}

#[tokio::test]
async fn test_comment_failure_leaves_no_trace() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    mount_posts(&server).await;
    Mock::given(method("POST"))
        .and(path("/community/posts/p1/comments"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": { "text": ["is too long"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let feed = remote_feed(Arc::clone(&h.client));
    feed.load().await.unwrap();
    let before = feed.post("p1").unwrap();

    let err = feed.add_comment("p1", me(), "x").await.unwrap_err();
    let CommunityError::Api(err) = err else {
        panic!("expected API error, got {err:?}");
    };
    assert_eq!(err.fields["text"], vec!["is too long".to_string()]);
    assert_eq!(feed.post("p1").unwrap(), before);
}

#[tokio::test]
async fn test_fallback_disabled_surfaces_failure() {
    skip_without_localhost!();
    let h = harness(&dead_base_url(), Some("a"), Some("r"));
    let api = community_api(Arc::clone(&h.client), &Config::default());

    let err = api.list_posts().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Network);
}

#[tokio::test]
async fn test_fallback_serves_seed_when_unreachable() {
    skip_without_localhost!();
    let h = harness(&dead_base_url(), Some("a"), Some("r"));
    let feed = CommunityFeed::new(community_api(Arc::clone(&h.client), &fallback_config()));

    let source = feed.load().await.unwrap();
    assert_eq!(
        source,
        FeedSource::Seed {
            reason: SeedReason::Unreachable
        }
    );
    assert!(!feed.posts().is_empty());
}

#[tokio::test]
async fn test_fallback_serves_seed_when_not_implemented() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/community/posts"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let api = community_api(Arc::clone(&h.client), &fallback_config());
    let page = api.list_posts().await.unwrap();
    assert_eq!(
        page.source,
        FeedSource::Seed {
            reason: SeedReason::NotImplemented
        }
    );
}

#[tokio::test]
async fn test_fallback_does_not_mask_server_errors() {
    skip_without_localhost!();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/community/posts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Some("a"), Some("r"));
    let api = community_api(Arc::clone(&h.client), &fallback_config());
    assert_eq!(api.list_posts().await.unwrap_err().kind, ApiErrorKind::Server);
}
