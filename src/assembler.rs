//! Thread assembler.
//!
//! Builds nested post/comment trees from the flat rows a [`ContentStore`]
//! returns. Expansion is breadth-first by level with one store call per
//! node, and the caller's [`Page`] is applied at every level: top-level
//! comments and replies at every depth share the same bounds.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::store::{ContentStore, StoreError};
use crate::types::{Comment, CommentId, CommentThread, Page, Post, PostId, PostThread};

/// Error type for assembler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    /// A store call failed; the assembly was abandoned.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The caller cancelled the assembly.
    #[error("Assembly cancelled")]
    Cancelled,
}

impl AssemblyError {
    /// The underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

/// Caller-side cancellation signal.
///
/// Checked before every store call; once set, the assembly fails with
/// [`AssemblyError::Cancelled`] and no partial tree is returned.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Trigger half of a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    /// Create a linked handle/signal pair.
    pub fn pair() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Cancellation { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// True once the handle has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    fn check(&self) -> Result<(), AssemblyError> {
        if self.is_cancelled() {
            Err(AssemblyError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::never()
    }
}

impl CancelHandle {
    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Tree assembler over any content store.
///
/// The store may be a concrete backend or `dyn ContentStore`.
///
/// ## Algorithm
///
/// 1. Fetch the root node(s) (post, post list, comment, or comment list)
/// 2. For posts, fetch top-level comments with `get_comments_by_post_id`
/// 3. Set the frontier to those comments and, level by level, fetch each
///    frontier node's replies with `get_comments_by_parent_id`
/// 4. Stop when a level yields no replies, then nest the collected rows
pub struct ThreadAssembler<S: ContentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ContentStore + ?Sized> Clone for ThreadAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ContentStore + ?Sized> ThreadAssembler<S> {
    /// Create an assembler over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a post under a caller-generated id.
    pub async fn create_post(
        &self,
        id: PostId,
        text: impl Into<String> + Send,
        commentable: bool,
        author: impl Into<String> + Send,
    ) -> Result<Post, AssemblyError> {
        Ok(self
            .store
            .create_post(id, text.into(), commentable, author.into())
            .await?)
    }

    /// Create a comment on a post or a reply to a comment.
    pub async fn create_comment(
        &self,
        text: impl Into<String> + Send,
        item_id: &str,
        author: impl Into<String> + Send,
    ) -> Result<Comment, AssemblyError> {
        Ok(self
            .store
            .create_comment(text.into(), item_id, author.into())
            .await?)
    }

    /// Fetch one post with its full comment tree.
    pub async fn post_thread(
        &self,
        id: &PostId,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<PostThread, AssemblyError> {
        cancel.check()?;
        let post = self.store.get_post_by_id(id).await?;
        self.attach_comments(post, page, cancel).await
    }

    /// Fetch a page of posts, each with its full comment tree.
    pub async fn post_threads(
        &self,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<Vec<PostThread>, AssemblyError> {
        cancel.check()?;
        let posts = self.store.get_all_posts(page).await?;

        let mut threads = Vec::with_capacity(posts.len());
        for post in posts {
            threads.push(self.attach_comments(post, page, cancel).await?);
        }
        Ok(threads)
    }

    /// Fetch one comment with its reply tree.
    pub async fn comment_thread(
        &self,
        id: &CommentId,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<CommentThread, AssemblyError> {
        cancel.check()?;
        let comment = self.store.get_comment_by_id(id).await?;
        let mut threads = self.attach_replies(vec![comment], page, cancel).await?;
        // attach_replies returns one tree per root
        threads.pop().ok_or_else(|| StoreError::CommentNotFound(id.clone()).into())
    }

    /// Fetch a page of all comments, each with its reply tree.
    ///
    /// Replies appear both in the list and nested under their parents.
    pub async fn comment_threads(
        &self,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<Vec<CommentThread>, AssemblyError> {
        cancel.check()?;
        let comments = self.store.get_all_comments(page).await?;
        self.attach_replies(comments, page, cancel).await
    }

    async fn attach_comments(
        &self,
        post: Post,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<PostThread, AssemblyError> {
        cancel.check()?;
        let top_level = self.store.get_comments_by_post_id(&post.id, page).await?;
        let comments = self.attach_replies(top_level, page, cancel).await?;

        tracing::trace!(
            post_id = %post.id,
            top_level = comments.len(),
            "Post thread assembled"
        );
        Ok(PostThread { post, comments })
    }

    async fn attach_replies(
        &self,
        roots: Vec<Comment>,
        page: Page,
        cancel: &Cancellation,
    ) -> Result<Vec<CommentThread>, AssemblyError> {
        // parent id -> direct replies; each parent is fetched once
        let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
        let mut frontier: Vec<CommentId> = roots.iter().map(|c| c.id.clone()).collect();
        let mut depth = 0usize;

        while !frontier.is_empty() {
            let mut next = Vec::new();

            for parent_id in frontier {
                if children.contains_key(&parent_id) {
                    continue;
                }
                cancel.check()?;
                let replies = self.store.get_comments_by_parent_id(&parent_id, page).await?;
                next.extend(replies.iter().map(|r| r.id.clone()));
                children.insert(parent_id, replies);
            }

            depth += 1;
            tracing::trace!(depth, next_level = next.len(), "Reply level fetched");
            frontier = next;
        }

        Ok(roots
            .into_iter()
            .map(|root| nest(root, &children))
            .collect())
    }
}

/// Nest `root` and its descendants from the fetched reply lists.
///
/// Walks pre-order with an explicit stack, then folds nodes back to front
/// so every reply list is complete before its parent is built. Slot 0 is
/// the root; reply order within a level is the order the store returned.
fn nest(root: Comment, children: &HashMap<CommentId, Vec<Comment>>) -> CommentThread {
    let mut order: Vec<(Comment, usize)> = Vec::new();
    let mut pending: Vec<(Comment, usize)> = children
        .get(&root.id)
        .map(|replies| replies.iter().rev().cloned().map(|reply| (reply, 0)).collect())
        .unwrap_or_default();

    while let Some((comment, parent)) = pending.pop() {
        let slot = order.len() + 1;
        if let Some(replies) = children.get(&comment.id) {
            pending.extend(replies.iter().rev().cloned().map(|reply| (reply, slot)));
        }
        order.push((comment, parent));
    }

    let mut slots: Vec<Vec<CommentThread>> = std::iter::repeat_with(Vec::new)
        .take(order.len() + 1)
        .collect();
    for (offset, (comment, parent)) in order.into_iter().enumerate().rev() {
        let mut replies = std::mem::take(&mut slots[offset + 1]);
        replies.reverse();
        slots[parent].push(CommentThread { comment, replies });
    }

    let mut replies = std::mem::take(&mut slots[0]);
    replies.reverse();
    CommentThread { comment: root, replies }
}
