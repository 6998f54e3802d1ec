//! Optimistic mutations with compensating rollback.
//!
//! A [`Mutation`] computes the optimistic state and its inverse up front.
//! [`commit`] publishes the optimistic state, awaits the remote call, then
//! either folds server-assigned fields in or runs the inverse. The pattern is
//! stateless per call: callers must not issue a second mutation for the same
//! item while one is pending.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::model::{Author, Comment, Post, temp_id};
use crate::error::ApiResult;

/// Pre-computed undo for one applied mutation.
pub struct Inverse<S>(Box<dyn FnOnce(&mut S) + Send>);

impl<S> Inverse<S> {
    pub fn new(undo: impl FnOnce(&mut S) + Send + 'static) -> Self {
        Self(Box::new(undo))
    }

    pub fn revert(self, state: &mut S) {
        (self.0)(state);
    }
}

pub trait Mutation<S> {
    /// Server outcome of the remote call.
    type Confirmed;

    /// Returns the optimistic state and the inverse that restores `current`.
    fn apply(&self, current: &S) -> (S, Inverse<S>);

    /// Folds server-assigned fields into the already-applied state.
    fn reconcile(&self, _state: &mut S, _confirmed: &Self::Confirmed) {}
}

fn lock<S>(slot: &Mutex<S>) -> MutexGuard<'_, S> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies `mutation` to `slot`, runs `call`, and reconciles or rolls back.
///
/// # Errors
/// Returns the remote failure after the inverse has been applied.
pub async fn commit<S, M, F>(slot: &Mutex<S>, mutation: &M, call: F) -> ApiResult<M::Confirmed>
where
    M: Mutation<S>,
    F: Future<Output = ApiResult<M::Confirmed>>,
{
    let inverse = {
        let mut state = lock(slot);
        let (next, inverse) = mutation.apply(&state);
        *state = next;
        inverse
    };

    match call.await {
        Ok(confirmed) => {
            mutation.reconcile(&mut lock(slot), &confirmed);
            Ok(confirmed)
        }
        Err(err) => {
            inverse.revert(&mut lock(slot));
            Err(err)
        }
    }
}

/// Like or unlike a post.
///
/// Liking adds one; unliking subtracts one, clamped at zero. The flag always
/// toggles. The inverse restores the exact `(liked, likes)` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleLike;

impl Mutation<Post> for ToggleLike {
    type Confirmed = ();

    fn apply(&self, current: &Post) -> (Post, Inverse<Post>) {
        let (liked, likes) = (current.liked, current.likes);

        let mut next = current.clone();
        next.liked = !liked;
        next.likes = if next.liked {
            likes.saturating_add(1)
        } else {
            likes.saturating_sub(1)
        };

        let inverse = Inverse::new(move |post: &mut Post| {
            post.liked = liked;
            post.likes = likes;
        });
        (next, inverse)
    }
}

/// Add a comment under a temporary id, replaced in place on confirmation.
#[derive(Debug, Clone)]
pub struct AddComment {
    pub temp_id: String,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl AddComment {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            temp_id: temp_id(),
            author,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn temporary_comment(&self) -> Comment {
        Comment {
            id: self.temp_id.clone(),
            author: self.author.clone(),
            text: self.text.clone(),
            created_at: self.created_at,
        }
    }
}

impl Mutation<Post> for AddComment {
    type Confirmed = Comment;

    fn apply(&self, current: &Post) -> (Post, Inverse<Post>) {
        let mut next = current.clone();
        next.comments.insert(0, self.temporary_comment());
        next.comments_count = next.comments_count.saturating_add(1);

        let temp_id = self.temp_id.clone();
        let count = current.comments_count;
        let inverse = Inverse::new(move |post: &mut Post| {
            post.comments.retain(|c| c.id != temp_id);
            post.comments_count = count;
        });
        (next, inverse)
    }

    /// Swaps the temp comment for the server one. If the thread was reloaded
    /// and already carries the server comment, the temp copy is dropped; if
    /// the temp comment is gone, the server comment goes back at the head.
    fn reconcile(&self, state: &mut Post, confirmed: &Comment) {
        if state.comments.iter().any(|c| c.id == confirmed.id) {
            state.comments.retain(|c| c.id != self.temp_id);
            return;
        }
        match state.comments.iter_mut().find(|c| c.id == self.temp_id) {
            Some(slot) => *slot = confirmed.clone(),
            None => state.comments.insert(0, confirmed.clone()),
        }
    }
}
