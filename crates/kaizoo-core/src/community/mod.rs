//! Community feed: posts, likes and comments.
//!
//! Likes and comments are applied optimistically through
//! [`optimistic::commit`] and rolled back if the backend rejects them.

pub mod feed;
pub mod model;
pub mod optimistic;
mod seed;
pub mod service;

pub use feed::{CommunityError, CommunityFeed, MutationKind};
pub use model::{Author, Comment, Post};
pub use optimistic::{AddComment, Inverse, Mutation, ToggleLike, commit};
pub use seed::SeedCommunity;
pub use service::{
    CommunityApi, FallbackCommunity, FeedPage, FeedSource, RemoteCommunity, SeedReason,
    community_api,
};
