//! Client-side feed state.
//!
//! Each post lives in its own slot so a mutation on one post never blocks or
//! rolls back another. At most one like and one comment can be pending per
//! post; a second attempt is rejected until the first settles.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use super::model::{Author, Comment, Post};
use super::optimistic::{AddComment, ToggleLike, commit};
use super::service::{CommunityApi, FeedSource};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Like,
    Comment,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Like => write!(f, "like"),
            MutationKind::Comment => write!(f, "comment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("post {0} is not in the feed")]
    UnknownPost(String),
    #[error("a {kind} on post {post_id} is still pending")]
    Pending { post_id: String, kind: MutationKind },
    #[error(transparent)]
    Api(#[from] ApiError),
}

type Slot = Arc<Mutex<Post>>;
type PendingSet = Arc<Mutex<HashSet<(String, MutationKind)>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a pending marker when the mutation settles or is dropped.
struct PendingGuard {
    pending: PendingSet,
    key: (String, MutationKind),
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.key);
    }
}

pub struct CommunityFeed {
    api: Arc<dyn CommunityApi>,
    posts: RwLock<Vec<Slot>>,
    pending: PendingSet,
    source: Mutex<Option<FeedSource>>,
}

impl CommunityFeed {
    pub fn new(api: Arc<dyn CommunityApi>) -> Self {
        Self {
            api,
            posts: RwLock::new(Vec::new()),
            pending: Arc::new(Mutex::new(HashSet::new())),
            source: Mutex::new(None),
        }
    }

    /// Replaces the feed with the latest listing.
    ///
    /// # Errors
    /// Returns the listing failure; the current feed is left untouched.
    pub async fn load(&self) -> ApiResult<FeedSource> {
        let page = self.api.list_posts().await?;
        debug!(count = page.posts.len(), source = ?page.source, "feed loaded");

        let slots = page
            .posts
            .into_iter()
            .map(|post| Arc::new(Mutex::new(post)))
            .collect();
        *self.posts.write().unwrap_or_else(PoisonError::into_inner) = slots;
        *lock(&self.source) = Some(page.source);
        Ok(page.source)
    }

    /// Where the current feed came from, if it has been loaded.
    pub fn source(&self) -> Option<FeedSource> {
        *lock(&self.source)
    }

    pub fn posts(&self) -> Vec<Post> {
        self.slots().iter().map(|slot| lock(slot).clone()).collect()
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.slot(post_id).ok().map(|slot| lock(&slot).clone())
    }

    pub fn is_pending(&self, post_id: &str, kind: MutationKind) -> bool {
        lock(&self.pending).contains(&(post_id.to_string(), kind))
    }

    /// Publishes a new post and puts it at the top of the feed.
    ///
    /// # Errors
    /// `Validation` for empty text, otherwise the backend failure.
    pub async fn create_post(&self, text: &str) -> Result<Post, CommunityError> {
        let text = non_empty("text", text)?;
        let post = self.api.create_post(text).await?;
        info!(post_id = %post.id, "post published");
        self.posts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, Arc::new(Mutex::new(post.clone())));
        Ok(post)
    }

    /// Likes or unlikes a post optimistically.
    ///
    /// # Errors
    /// `UnknownPost`, `Pending` when a like is already in flight for the
    /// post, or the backend failure after the post has been rolled back.
    pub async fn toggle_like(&self, post_id: &str) -> Result<Post, CommunityError> {
        let slot = self.slot(post_id)?;
        let _pending = self.begin(post_id, MutationKind::Like)?;

        let liking = !lock(&slot).liked;
        let api = Arc::clone(&self.api);
        let id = post_id.to_string();
        let call = async move {
            if liking {
                api.like(&id).await
            } else {
                api.unlike(&id).await
            }
        };

        if let Err(err) = commit(&slot, &ToggleLike, call).await {
            debug!(post_id, liking, error = %err, "like rolled back");
            return Err(err.into());
        }
        Ok(lock(&slot).clone())
    }

    /// Adds a comment optimistically under a temporary id.
    ///
    /// # Errors
    /// `Validation` for empty text, `UnknownPost`, `Pending`, or the backend
    /// failure after the temporary comment has been withdrawn.
    pub async fn add_comment(
        &self,
        post_id: &str,
        author: Author,
        text: &str,
    ) -> Result<Comment, CommunityError> {
        let text = non_empty("text", text)?;
        let slot = self.slot(post_id)?;
        let _pending = self.begin(post_id, MutationKind::Comment)?;

        let mutation = AddComment::new(author, text);
        let api = Arc::clone(&self.api);
        let id = post_id.to_string();
        let body = text.to_string();
        let call = async move { api.add_comment(&id, &body).await };

        commit(&slot, &mutation, call).await.map_err(|err| {
            debug!(post_id, temp_id = %mutation.temp_id, error = %err, "comment rolled back");
            CommunityError::from(err)
        })
    }

    /// Loads the full comment thread for a post.
    ///
    /// Temporary comments still awaiting confirmation stay at the head of the
    /// thread so their rollback or reconcile finds them.
    ///
    /// # Errors
    /// `UnknownPost`, or the backend failure.
    pub async fn load_comments(&self, post_id: &str) -> Result<Vec<Comment>, CommunityError> {
        let slot = self.slot(post_id)?;
        let comments = self.api.list_comments(post_id).await?;

        let mut post = lock(&slot);
        let mut thread: Vec<Comment> = post
            .comments
            .iter()
            .filter(|c| c.is_temporary())
            .cloned()
            .collect();
        let pending = thread.len();
        thread.extend(comments.iter().cloned());
        if pending > 0 {
            debug!(post_id, pending, "kept pending comments across reload");
        }

        post.comments_count = post
            .comments_count
            .max(u32::try_from(thread.len()).unwrap_or(u32::MAX));
        post.comments = thread;
        Ok(comments)
    }

    fn slots(&self) -> Vec<Slot> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn slot(&self, post_id: &str) -> Result<Slot, CommunityError> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|slot| lock(slot).id == post_id)
            .map(Arc::clone)
            .ok_or_else(|| CommunityError::UnknownPost(post_id.to_string()))
    }

    fn begin(&self, post_id: &str, kind: MutationKind) -> Result<PendingGuard, CommunityError> {
        let key = (post_id.to_string(), kind);
        if !lock(&self.pending).insert(key.clone()) {
            return Err(CommunityError::Pending {
                post_id: post_id.to_string(),
                kind,
            });
        }
        Ok(PendingGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }
}

fn non_empty<'a>(field: &str, text: &'a str) -> ApiResult<&'a str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::invalid_field(field, "Text cannot be empty"));
    }
    Ok(text)
}
