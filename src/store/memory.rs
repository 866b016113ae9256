//! In-memory content store for development and testing.

use std::collections::BTreeMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{Comment, CommentId, Page, Post, PostId};
use super::{check_text, ContentStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    /// Posts by ID.
    posts: BTreeMap<PostId, Post>,
    /// Comments by ID.
    comments: BTreeMap<CommentId, Comment>,
}

/// In-memory content store.
///
/// Both collections sit behind one read/write lock: reads share it, the two
/// create operations take it exclusively, so a reader never sees a
/// half-inserted entity and a comment's target cannot change between
/// resolution and insert. BTreeMap keys give id ordering, which matches
/// the PostgreSQL backend.
///
/// Filtering and pagination are linear scans under the read lock.
/// Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    tables: RwLock<Tables>,
}

impl InMemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of posts.
    pub fn num_posts(&self) -> usize {
        self.tables.read().posts.len()
    }

    /// Get number of comments.
    pub fn num_comments(&self) -> usize {
        self.tables.read().comments.len()
    }

    fn scan_comments<F>(&self, page: Page, keep: F) -> Vec<Comment>
    where
        F: Fn(&Comment) -> bool,
    {
        let tables = self.tables.read();
        page.apply(tables.comments.values().filter(|c| keep(c)).cloned())
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn create_post(
        &self,
        id: PostId,
        text: String,
        commentable: bool,
        author: String,
    ) -> Result<Post, StoreError> {
        check_text("post id", id.as_str())?;
        check_text("text", &text)?;
        check_text("author", &author)?;

        let mut tables = self.tables.write();
        if tables.posts.contains_key(&id) {
            return Err(StoreError::DuplicatePostId(id));
        }

        let post = Post::new(id, text, author, commentable);
        tables.posts.insert(post.id.clone(), post.clone());
        tracing::debug!(post_id = %post.id, commentable, "Post created");
        Ok(post)
    }

    async fn get_post_by_id(&self, id: &PostId) -> Result<Post, StoreError> {
        self.tables
            .read()
            .posts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::PostNotFound(id.clone()))
    }

    async fn get_all_posts(&self, page: Page) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read();
        Ok(page.apply(tables.posts.values().cloned()))
    }

    async fn create_comment(
        &self,
        text: String,
        item_id: &str,
        author: String,
    ) -> Result<Comment, StoreError> {
        check_text("text", &text)?;
        check_text("author", &author)?;

        let mut tables = self.tables.write();
        let id = CommentId::generate();
        if tables.comments.contains_key(&id) {
            return Err(StoreError::DuplicateCommentId(id));
        }

        let comment = if let Some(post) = tables.posts.get(&PostId::new(item_id)) {
            if !post.commentable {
                return Err(StoreError::CommentingDisabled(post.id.clone()));
            }
            Comment::top_level(id, post.id.clone(), text, author)
        } else if let Some(parent) = tables.comments.get(&CommentId::new(item_id)) {
            Comment::reply_to(parent, id, text, author)
        } else {
            return Err(StoreError::ItemNotFound(item_id.to_string()));
        };

        tables.comments.insert(comment.id.clone(), comment.clone());
        tracing::debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_comment_id = ?comment.parent_comment_id,
            "Comment created"
        );
        Ok(comment)
    }

    async fn get_comment_by_id(&self, id: &CommentId) -> Result<Comment, StoreError> {
        self.tables
            .read()
            .comments
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CommentNotFound(id.clone()))
    }

    async fn get_all_comments(&self, page: Page) -> Result<Vec<Comment>, StoreError> {
        Ok(self.scan_comments(page, |_| true))
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: &PostId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        Ok(self.scan_comments(page, |c| c.is_top_level() && &c.post_id == post_id))
    }

    async fn get_comments_by_parent_id(
        &self,
        parent_id: &CommentId,
        page: Page,
    ) -> Result<Vec<Comment>, StoreError> {
        Ok(self.scan_comments(page, |c| c.parent_comment_id.as_ref() == Some(parent_id)))
    }
}
