//! Comment types for the thread kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::post::PostId;

/// Unique identifier for a comment.
///
/// Comment ids are always generated by the engine (UUID v4 strings), but
/// stores accept any opaque string when reading.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    /// Create a CommentId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random CommentId (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CommentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stored comment.
///
/// `post_id` is the root of the thread and is set for every comment,
/// including deep replies. `parent_comment_id` is `None` for a top-level
/// comment and names the direct parent for a reply.
///
/// Replies are not part of the stored value; see
/// [`CommentThread`](super::thread::CommentThread).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Body text.
    pub text: String,
    /// Opaque author identity supplied by the caller.
    pub author: String,
    /// Root post of the thread.
    pub post_id: PostId,
    /// Direct parent comment, if this is a reply.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_comment_id: Option<CommentId>,
}

impl Comment {
    /// Create a top-level comment on a post.
    pub fn top_level(
        id: CommentId,
        post_id: PostId,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            author: author.into(),
            post_id,
            parent_comment_id: None,
        }
    }

    /// Create a reply to `parent`, inheriting its thread root.
    pub fn reply_to(
        parent: &Comment,
        id: CommentId,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            author: author.into(),
            post_id: parent.post_id.clone(),
            parent_comment_id: Some(parent.id.clone()),
        }
    }

    /// True if this comment hangs directly off its post.
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}
