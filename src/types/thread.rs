//! Assembled thread projections.
//!
//! Comments are stored flat with parent pointers. These types are the
//! read-time nesting built by [`ThreadAssembler`](crate::ThreadAssembler);
//! they are never persisted.

use serde::{Deserialize, Serialize};

use super::comment::Comment;
use super::post::Post;

/// A comment with its replies attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    /// The stored comment.
    #[serde(flatten)]
    pub comment: Comment,
    /// Direct replies, each with their own replies attached.
    #[serde(default)]
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Wrap a comment with no replies.
    pub fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Number of comments in this subtree, including the root.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }

    /// Depth of this subtree (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.replies.iter().map(|reply| (reply, level + 1)));
        }
        deepest
    }

    /// Sort every level by comment id.
    ///
    /// Two trees with the same members at each level compare equal after
    /// canonicalization, whatever order the store returned them in.
    pub fn canonicalize(&mut self) {
        canonicalize_level(&mut self.replies);
    }
}

// Reply chains have no depth bound; tear them down with a work list
// instead of the recursive drop glue.
impl Drop for CommentThread {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// A post with its comment thread attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostThread {
    /// The stored post.
    #[serde(flatten)]
    pub post: Post,
    /// Top-level comments, each with replies attached.
    #[serde(default)]
    pub comments: Vec<CommentThread>,
}

impl PostThread {
    /// Wrap a post with no comments.
    pub fn bare(post: Post) -> Self {
        Self {
            post,
            comments: Vec::new(),
        }
    }

    /// Number of comments in the whole thread.
    pub fn comment_count(&self) -> usize {
        self.comments.iter().map(CommentThread::node_count).sum()
    }

    /// Sort every level by comment id. See [`CommentThread::canonicalize`].
    pub fn canonicalize(&mut self) {
        canonicalize_level(&mut self.comments);
    }
}

fn canonicalize_level(level: &mut [CommentThread]) {
    let mut stack = vec![level];
    while let Some(nodes) = stack.pop() {
        nodes.sort_by(|a, b| a.comment.id.cmp(&b.comment.id));
        for node in nodes {
            stack.push(node.replies.as_mut_slice());
        }
    }
}
