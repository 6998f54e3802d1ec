//! Community feed command handlers.

use anyhow::{Context, Result};
use kaizoo_core::community::{Author, CommunityError, CommunityFeed, FeedSource, Post};
use serde::Serialize;

use super::format_timestamp;
use crate::cli::app::App;

#[derive(Serialize)]
struct FeedView<'a> {
    #[serde(flatten)]
    source: FeedSource,
    posts: &'a [Post],
}

/// Unwraps backend failures so field errors reach the top-level report.
fn report(err: CommunityError) -> anyhow::Error {
    match err {
        CommunityError::Api(api) => api.into(),
        other => other.into(),
    }
}

async fn loaded(app: &App) -> Result<CommunityFeed> {
    let feed = app.feed();
    let source = feed.load().await.context("load community feed")?;
    if let FeedSource::Seed { reason } = source {
        eprintln!("Showing sample posts ({reason}).");
    }
    Ok(feed)
}

/// Comment author for the signed-in user, from their profile.
async fn me(app: &App) -> Result<Author> {
    match app.profiles().get().await {
        Ok(profile) => Ok(Author {
            id: profile.id,
            name: profile.display_name.unwrap_or(profile.email),
            avatar_url: profile.avatar_url,
        }),
        Err(err) if err.is_unreachable() => Ok(Author {
            id: "me".into(),
            name: "You".into(),
            avatar_url: None,
        }),
        Err(err) => Err(err.into()),
    }
}

pub async fn list(app: &App, with_comments: bool) -> Result<()> {
    let feed = loaded(app).await?;
    let posts = feed.posts();
    let view = FeedView {
        source: feed.source().unwrap_or(FeedSource::Remote),
        posts: &posts,
    };

    app.emit(&view, |v| {
        if v.posts.is_empty() {
            println!("No posts yet.");
        }
        for post in v.posts {
            print_post(post);
            if with_comments {
                for c in post.comments.iter().take(3) {
                    println!("    {}: {}", c.author.name, c.text);
                }
            }
        }
    })
}

pub async fn post(app: &App, text: &str) -> Result<()> {
    let feed = loaded(app).await?;
    let post = feed.create_post(text).await.map_err(report)?;
    app.emit(&post, |p| println!("Posted {}", p.id))
}

/// Likes or unlikes a post, rolling back on failure.
pub async fn set_liked(app: &App, id: &str, liked: bool) -> Result<()> {
    let feed = loaded(app).await?;
    let current = feed
        .post(id)
        .with_context(|| format!("Post {id} is not in the feed"))?;

    let post = if current.liked == liked {
        current
    } else {
        feed.toggle_like(id).await.map_err(report)?
    };
    app.emit(&post, |p| {
        let verb = if p.liked { "Liked" } else { "Not liked" };
        println!("{verb}: {} ({} likes)", p.id, p.likes);
    })
}

pub async fn comment(app: &App, id: &str, text: &str) -> Result<()> {
    let feed = loaded(app).await?;
    let author = me(app).await?;
    let comment = feed.add_comment(id, author, text).await.map_err(report)?;
    app.emit(&comment, |c| println!("Commented on {id} ({})", c.id))
}

pub async fn comments(app: &App, id: &str) -> Result<()> {
    let feed = loaded(app).await?;
    let comments = feed.load_comments(id).await.map_err(report)?;
    app.emit(&comments, |list| {
        if list.is_empty() {
            println!("No comments yet.");
        }
        for c in list {
            println!(
                "{}  {}: {}",
                format_timestamp(c.created_at),
                c.author.name,
                c.text
            );
        }
    })
}

fn print_post(post: &Post) {
    let liked = if post.liked { " (liked)" } else { "" };
    println!(
        "{}  {}  {}\n    {}\n    {} likes{liked}, {} comments",
        post.id,
        post.author.name,
        format_timestamp(post.created_at),
        post.text,
        post.likes,
        post.comments_count
    );
}
