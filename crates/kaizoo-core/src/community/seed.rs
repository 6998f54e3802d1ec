use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::model::{Author, Comment, Post};
use super::service::{CommunityApi, FeedPage, FeedSource, SeedReason};
use crate::error::{ApiError, ApiErrorKind, ApiResult};

/// In-memory community backed by a fixed starter feed.
pub struct SeedCommunity {
    posts: Mutex<Vec<Post>>,
}

impl Default for SeedCommunity {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedCommunity {
    pub fn new() -> Self {
        Self::with_posts(seed_posts())
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
        }
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.lock().iter().any(|p| p.id == post_id)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Post>> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_post<T>(&self, post_id: &str, f: impl FnOnce(&mut Post) -> T) -> ApiResult<T> {
        let mut posts = self.lock();
        let post = posts.iter_mut().find(|p| p.id == post_id).ok_or_else(|| {
            let mut err = ApiError::new(ApiErrorKind::Validation, "Post not found");
            err.status = Some(404);
            err
        })?;
        Ok(f(post))
    }
}

fn you() -> Author {
    Author {
        id: "me".into(),
        name: "You".into(),
        avatar_url: None,
    }
}

fn author(id: &str, name: &str) -> Author {
    Author {
        id: id.into(),
        name: name.into(),
        avatar_url: None,
    }
}

fn seed_posts() -> Vec<Post> {
    let now = Utc::now();
    let coach = author("seed-coach", "Coach Kai");
    let mira = author("seed-mira", "Mira");
    let theo = author("seed-theo", "Theo");

    vec![
        Post {
            id: "seed-1".into(),
            author: coach.clone(),
            text: "Welcome to Kaizoo! Log your first activity to start a streak.".into(),
            created_at: now - Duration::hours(2),
            likes: 12,
            liked: false,
            comments_count: 1,
            comments: vec![Comment {
                id: "seed-c1".into(),
                author: mira.clone(),
                text: "Day one done!".into(),
                created_at: now - Duration::minutes(90),
            }],
        },
        Post {
            id: "seed-2".into(),
            author: mira,
            text: "Morning 5k in the rain. Still counts.".into(),
            created_at: now - Duration::hours(5),
            likes: 4,
            liked: false,
            comments_count: 0,
            comments: Vec::new(),
        },
        Post {
            id: "seed-3".into(),
            author: theo,
            text: "Joined the October step challenge. Who else?".into(),
            created_at: now - Duration::days(1),
            likes: 0,
            liked: false,
            comments_count: 1,
            comments: vec![Comment {
                id: "seed-c2".into(),
                author: coach,
                text: "Count me in.".into(),
                created_at: now - Duration::hours(20),
            }],
        },
    ]
}

#[async_trait]
impl CommunityApi for SeedCommunity {
    async fn list_posts(&self) -> ApiResult<FeedPage> {
        Ok(FeedPage {
            posts: self.lock().clone(),
            source: FeedSource::Seed {
                reason: SeedReason::Offline,
            },
        })
    }

    async fn create_post(&self, text: &str) -> ApiResult<Post> {
        let post = Post {
            id: format!("seed-{}", uuid::Uuid::new_v4()),
            author: you(),
            text: text.to_string(),
            created_at: Utc::now(),
            likes: 0,
            liked: false,
            comments_count: 0,
            comments: Vec::new(),
        };
        self.lock().insert(0, post.clone());
        Ok(post)
    }

    async fn like(&self, post_id: &str) -> ApiResult<()> {
        self.with_post(post_id, |post| {
            if !post.liked {
                post.liked = true;
                post.likes = post.likes.saturating_add(1);
            }
        })
    }

    async fn unlike(&self, post_id: &str) -> ApiResult<()> {
        self.with_post(post_id, |post| {
            if post.liked {
                post.liked = false;
                post.likes = post.likes.saturating_sub(1);
            }
        })
    }

    async fn list_comments(&self, post_id: &str) -> ApiResult<Vec<Comment>> {
        self.with_post(post_id, |post| post.comments.clone())
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> ApiResult<Comment> {
        let comment = Comment {
            id: format!("seed-c-{}", uuid::Uuid::new_v4()),
            author: you(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.with_post(post_id, |post| {
            post.comments.insert(0, comment.clone());
            post.comments_count = post.comments_count.saturating_add(1);
        })?;
        Ok(comment)
    }
}
