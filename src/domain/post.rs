use serde::{Deserialize, Serialize};

use super::{now_utc_rfc3339, truncate_chars, MAX_DESCRIPTION_CHARS, MAX_NOTES_CHARS};

/// Social entities. They carry no derived state; they matter to the
/// store as quota pressure and backup payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Post {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner: String::new(),
            content: String::new(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Comment {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub likes: Vec<String>,
    pub created_at: String,
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner: String::new(),
            content: String::new(),
            likes: Vec::new(),
            created_at: String::new(),
        }
    }
}

impl Post {
    pub fn create(id: String, owner: &str, content: &str) -> Self {
        let now = now_utc_rfc3339();
        Self {
            id,
            owner: owner.trim().to_string(),
            content: truncate_chars(content.trim(), MAX_NOTES_CHARS),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Record a like; returns false when the user already liked the post.
    pub fn like(&mut self, user: &str) -> bool {
        let user = user.trim();
        if user.is_empty() || self.likes.iter().any(|existing| existing == user) {
            return false;
        }
        self.likes.push(user.to_string());
        self.updated_at = now_utc_rfc3339();
        true
    }

    pub fn unlike(&mut self, user: &str) -> bool {
        let before = self.likes.len();
        self.likes.retain(|existing| existing != user.trim());
        let removed = self.likes.len() != before;
        if removed {
            self.updated_at = now_utc_rfc3339();
        }
        removed
    }

    pub fn add_comment(&mut self, id: String, owner: &str, content: &str) -> &Comment {
        let comment = Comment {
            id,
            owner: owner.trim().to_string(),
            content: truncate_chars(content.trim(), MAX_DESCRIPTION_CHARS),
            likes: Vec::new(),
            created_at: now_utc_rfc3339(),
        };
        self.comments.push(comment);
        self.updated_at = now_utc_rfc3339();
        self.comments.last().expect("comment was just pushed")
    }
}
