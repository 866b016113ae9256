//! Post types for the thread kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a post.
///
/// Opaque to the engine: the caller chooses it (usually a UUID string)
/// and the engine only compares it for equality and byte order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    /// Create a PostId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random PostId (UUID v4).
    ///
    /// The engine never calls this itself; front ends use it before
    /// calling `create_post`.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PostId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stored post.
///
/// Immutable once created. `commentable` is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier.
    pub id: PostId,
    /// Body text.
    pub text: String,
    /// Opaque author identity supplied by the caller.
    pub author: String,
    /// Whether top-level comments may be attached to this post.
    pub commentable: bool,
}

impl Post {
    /// Create a new post value.
    pub fn new(
        id: PostId,
        text: impl Into<String>,
        author: impl Into<String>,
        commentable: bool,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            author: author.into(),
            commentable,
        }
    }
}
