use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of client-generated comment ids awaiting server confirmation.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generates a temporary comment id.
pub fn temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

/// A feed post. `likes` and `liked` always move together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub comments_count: u32,
    /// Most recent first.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_decodes_with_defaults() {
        let post: Post = serde_json::from_str(
            r#"{"id":"p1","author":{"id":"u1","name":"Ana"},"text":"5k done","createdAt":"2026-10-01T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(post.likes, 0);
        assert!(!post.liked);
        assert!(post.comments.is_empty());
    }

    #[test]
    fn test_temp_id() {
        let id = temp_id();
        assert!(id.starts_with("temp-"));
        assert_ne!(id, temp_id());
    }
}
