//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kaizoo_core::auth::{CredentialProvider, StoredCredentials};
use kaizoo_core::storage::{KeyValueStore, MemoryStore, keys};
use kaizoo_core::{ApiClient, ApiResult};
use serde_json::json;
use wiremock::ResponseTemplate;

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Stored credentials that count how often they were cleared.
pub struct CountingCredentials {
    pub inner: StoredCredentials,
    pub clears: AtomicUsize,
}

impl CountingCredentials {
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingCredentials {
    async fn access_token(&self) -> ApiResult<Option<String>> {
        self.inner.access_token().await
    }

    async fn refresh_token(&self) -> ApiResult<Option<String>> {
        self.inner.refresh_token().await
    }

    async fn store(&self, access_token: &str, refresh_token: Option<&str>) -> ApiResult<()> {
        self.inner.store(access_token, refresh_token).await
    }

    async fn clear(&self) -> ApiResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear().await
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub credentials: Arc<CountingCredentials>,
    pub client: Arc<ApiClient>,
}

impl Harness {
    pub fn stored_access(&self) -> Option<String> {
        self.store.snapshot().get(keys::ACCESS_TOKEN).cloned()
    }

    pub fn stored_refresh(&self) -> Option<String> {
        self.store.snapshot().get(keys::REFRESH_TOKEN).cloned()
    }
}

/// Builds a client against `base_url` with the given stored tokens.
pub fn harness(base_url: &str, access: Option<&str>, refresh: Option<&str>) -> Harness {
    harness_with_timeout(base_url, access, refresh, None)
}

pub fn harness_with_timeout(
    base_url: &str,
    access: Option<&str>,
    refresh: Option<&str>,
    timeout: Option<Duration>,
) -> Harness {
    let mut entries = Vec::new();
    if let Some(access) = access {
        entries.push((keys::ACCESS_TOKEN, access));
    }
    if let Some(refresh) = refresh {
        entries.push((keys::REFRESH_TOKEN, refresh));
    }
    let store = Arc::new(MemoryStore::with_entries(entries));
    let credentials = Arc::new(CountingCredentials {
        inner: StoredCredentials::new(Arc::clone(&store) as Arc<dyn KeyValueStore>),
        clears: AtomicUsize::new(0),
    });
    let client = ApiClient::with_base_url(
        base_url,
        timeout,
        Arc::clone(&credentials) as Arc<dyn CredentialProvider>,
    )
    .expect("build client");

    Harness {
        store,
        credentials,
        client: Arc::new(client),
    }
}

pub fn token_pair(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "accessToken": access,
        "refreshToken": refresh,
    }))
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" }))
}

pub fn profile_body() -> serde_json::Value {
    json!({
        "id": "u1",
        "email": "ana@example.com",
        "displayName": "Ana",
        "level": 3,
        "xp": 420,
        "streakDays": 5
    })
}

/// A base URL nothing listens on.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
