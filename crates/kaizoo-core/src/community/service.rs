//! Community backend seam.
//!
//! [`RemoteCommunity`] talks to the API. [`FallbackCommunity`] wraps it and,
//! when enabled, serves seed data for reads the backend cannot answer. The
//! degradation is always reported through [`FeedSource`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::{Comment, Post};
use super::seed::SeedCommunity;
use crate::client::{ApiClient, ApiRequest};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::services::path_segment;

/// Why a listing came from seed data instead of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedReason {
    /// Seed data was requested directly.
    Offline,
    /// No response from the backend.
    Unreachable,
    /// The backend answered 404 or 501 for the endpoint.
    NotImplemented,
}

impl fmt::Display for SeedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedReason::Offline => write!(f, "offline"),
            SeedReason::Unreachable => write!(f, "backend unreachable"),
            SeedReason::NotImplemented => write!(f, "endpoint not available"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeedSource {
    Remote,
    Seed { reason: SeedReason },
}

impl FeedSource {
    pub fn is_seed(&self) -> bool {
        matches!(self, FeedSource::Seed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub source: FeedSource,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    text: &'a str,
}

/// Community operations. Likes are fire-and-confirm: success carries no data.
#[async_trait]
pub trait CommunityApi: Send + Sync {
    async fn list_posts(&self) -> ApiResult<FeedPage>;
    async fn create_post(&self, text: &str) -> ApiResult<Post>;
    async fn like(&self, post_id: &str) -> ApiResult<()>;
    async fn unlike(&self, post_id: &str) -> ApiResult<()>;
    async fn list_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>>;
    async fn add_comment(&self, post_id: &str, text: &str) -> ApiResult<Comment>;
}

pub struct RemoteCommunity {
    client: Arc<ApiClient>,
}

impl RemoteCommunity {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

fn post_path(post_id: &str, suffix: &str) -> ApiResult<String> {
    let id = path_segment("post_id", post_id)?;
    Ok(format!("/community/posts/{id}{suffix}"))
}

#[async_trait]
impl CommunityApi for RemoteCommunity {
    async fn list_posts(&self) -> ApiResult<FeedPage> {
        let posts = self
            .client
            .send_json(ApiRequest::get("/community/posts"))
            .await?;
        Ok(FeedPage {
            posts,
            source: FeedSource::Remote,
        })
    }

    async fn create_post(&self, text: &str) -> ApiResult<Post> {
        let request = ApiRequest::post("/community/posts").body(&TextBody { text })?;
        self.client.send_json(request).await
    }

    async fn like(&self, post_id: &str) -> ApiResult<()> {
        let request = ApiRequest::post(post_path(post_id, "/like")?);
        self.client.send_empty(request).await
    }

    async fn unlike(&self, post_id: &str) -> ApiResult<()> {
        let request = ApiRequest::delete(post_path(post_id, "/like")?);
        self.client.send_empty(request).await
    }

    async fn list_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        let request = ApiRequest::get(post_path(post_id, "/comments")?);
        self.client.send_json(request).await
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> ApiResult<Comment> {
        let request = ApiRequest::post(post_path(post_id, "/comments")?).body(&TextBody { text })?;
        self.client.send_json(request).await
    }
}

/// Returns the seed reason for failures that qualify for a fallback.
///
/// Auth, validation and server errors never qualify.
pub(crate) fn fallback_reason(err: &ApiError) -> Option<SeedReason> {
    if err.is_unreachable() {
        return Some(SeedReason::Unreachable);
    }
    match err.status {
        Some(404 | 501) => Some(SeedReason::NotImplemented),
        _ => None,
    }
}

/// Remote backend with a seed-data fallback for reads.
///
/// Mutations are never redirected after a remote failure. They target the
/// seed store only while the last listing was served from it, so posts the
/// user sees and the store that mutates them stay consistent.
pub struct FallbackCommunity {
    remote: Arc<dyn CommunityApi>,
    seed: SeedCommunity,
    serving_seed: AtomicBool,
}

impl FallbackCommunity {
    pub fn new(remote: Arc<dyn CommunityApi>, seed: SeedCommunity) -> Self {
        Self {
            remote,
            seed,
            serving_seed: AtomicBool::new(false),
        }
    }

    fn serving_seed(&self) -> bool {
        self.serving_seed.load(Ordering::SeqCst)
    }

    fn mutations(&self) -> &dyn CommunityApi {
        if self.serving_seed() {
            &self.seed
        } else {
            self.remote.as_ref()
        }
    }
}

#[async_trait]
impl CommunityApi for FallbackCommunity {
    async fn list_posts(&self) -> ApiResult<FeedPage> {
        match self.remote.list_posts().await {
            Ok(page) => {
                self.serving_seed.store(false, Ordering::SeqCst);
                Ok(page)
            }
            Err(err) => {
                let Some(reason) = fallback_reason(&err) else {
                    return Err(err);
                };
                warn!(%reason, error = %err, "community feed served from seed data");
                self.serving_seed.store(true, Ordering::SeqCst);
                let posts = self.seed.list_posts().await?.posts;
                Ok(FeedPage {
                    posts,
                    source: FeedSource::Seed { reason },
                })
            }
        }
    }

    async fn create_post(&self, text: &str) -> ApiResult<Post> {
        self.mutations().create_post(text).await
    }

    async fn like(&self, post_id: &str) -> ApiResult<()> {
        self.mutations().like(post_id).await
    }

    async fn unlike(&self, post_id: &str) -> ApiResult<()> {
        self.mutations().unlike(post_id).await
    }

    async fn list_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        if self.serving_seed() {
            return self.seed.list_comments(post_id).await;
        }
        match self.remote.list_comments(post_id).await {
            Err(err) if fallback_reason(&err).is_some() && self.seed.contains(post_id) => {
                debug!(post_id, error = %err, "comments served from seed data");
                self.seed.list_comments(post_id).await
            }
            other => other,
        }
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> ApiResult<Comment> {
        self.mutations().add_comment(post_id, text).await
    }
}

/// Builds the community backend selected by `[community]` config.
pub fn community_api(client: Arc<ApiClient>, config: &Config) -> Arc<dyn CommunityApi> {
    let remote: Arc<dyn CommunityApi> = Arc::new(RemoteCommunity::new(client));
    if config.community.offline_fallback {
        Arc::new(FallbackCommunity::new(remote, SeedCommunity::new()))
    } else {
        remote
    }
}
