//! Content storage backends.
//!
//! [`ContentStore`] is the backend-neutral contract. Two implementations
//! ship with the crate and must be observably identical:
//!
//! - [`InMemoryContentStore`]: volatile, process-local, for development and tests
//! - [`PostgresContentStore`]: relational, durable (feature `postgres`)
//!
//! ## Shared semantics
//!
//! - Every list operation is ordered by id (byte order) and paginated with
//!   [`Page`], which only applies when both `limit` and `offset` are present.
//! - `get_comments_by_post_id` returns top-level comments only; replies are
//!   reached through `get_comments_by_parent_id`.
//! - Creating a post or comment with an existing id fails with a duplicate error.
//! - Empty results are `Ok(vec![])`, never an error.
//! - Ids, text and author may not contain NUL (`U+0000`); creates reject
//!   them with [`StoreError::NulCharacter`] and lookups by such an id find
//!   nothing.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::types::{Comment, CommentId, Page, Post, PostId};

/// Error type shared by every content store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No post with this id.
    #[error("Post not found: {0}")]
    PostNotFound(PostId),
    /// No comment with this id.
    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),
    /// Comment target matches neither a post nor a comment.
    #[error("Item not found: {0}")]
    ItemNotFound(String),
    /// The post exists but its author turned off comments.
    #[error("Commenting is disabled for post {0}")]
    CommentingDisabled(PostId),
    /// A post with this id already exists.
    #[error("Duplicate post id: {0}")]
    DuplicatePostId(PostId),
    /// A comment with this id already exists.
    #[error("Duplicate comment id: {0}")]
    DuplicateCommentId(CommentId),
    /// A field holds a NUL character, which PostgreSQL `TEXT` cannot store.
    #[error("Invalid {0}: NUL characters are not allowed")]
    NulCharacter(&'static str),
    /// The storage medium could not be reached.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// True for the lookup-by-id failures (`PostNotFound`, `CommentNotFound`, `ItemNotFound`).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PostNotFound(_) | Self::CommentNotFound(_) | Self::ItemNotFound(_)
        )
    }

    /// True for id collisions on create.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicatePostId(_) | Self::DuplicateCommentId(_))
    }
}

/// Reject values containing NUL before they reach a backend.
pub(crate) fn check_text(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.contains('\0') {
        Err(StoreError::NulCharacter(field))
    } else {
        Ok(())
    }
}

/// True when `id` can never name a stored row.
pub(crate) fn unstorable(id: &str) -> bool {
    id.contains('\0')
}

/// Trait for post/comment storage backends.
///
/// Implementations are shared across concurrent requests, so every method
/// takes `&self`. The trait is object safe; callers may hold an
/// `Arc<dyn ContentStore>` and pick the backend at runtime.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a post under a caller-supplied id.
    async fn create_post(
        &self,
        id: PostId,
        text: String,
        commentable: bool,
        author: String,
    ) -> Result<Post, StoreError>;

    /// Fetch a post by id.
    async fn get_post_by_id(&self, id: &PostId) -> Result<Post, StoreError>;

    /// List posts.
    async fn get_all_posts(&self, page: Page) -> Result<Vec<Post>, StoreError>;

    /// Create a comment on `item_id`, which may name a post or a comment.
    ///
    /// Resolution order:
    /// 1. `item_id` is a post: top-level comment, unless the post is not
    ///    commentable (`CommentingDisabled`).
    /// 2. `item_id` is a comment: reply inheriting the parent's `post_id`.
    /// 3. Otherwise `ItemNotFound`.
    ///
    /// Replies to comments are accepted even when the root post is not
    /// commentable; only the post-level gate is checked.
    async fn create_comment(
        &self,
        text: String,
        item_id: &str,
        author: String,
    ) -> Result<Comment, StoreError>;

    /// Fetch a comment by id (no replies attached).
    async fn get_comment_by_id(&self, id: &CommentId) -> Result<Comment, StoreError>;

    /// List every comment across all posts.
    async fn get_all_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError>;

    /// List the top-level comments of a post.
    async fn get_comments_by_post_id(
        &self,
        post_id: &PostId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError>;

    /// List the direct replies to a comment.
    async fn get_comments_by_parent_id(
        &self,
        parent_id: &CommentId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub use memory::InMemoryContentStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresContentStore, PoolStats};
