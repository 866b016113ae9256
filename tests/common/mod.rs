//! Shared helpers for integration tests: random operation sequences that
//! can be replayed against any content store, and an id-free tree shape
//! for comparing results across backends.

#![allow(dead_code)]

use proptest::prelude::*;
use proptest::sample::Index;

use thread_kernel::{
    Cancellation, Comment, CommentThread, ContentStore, Page, PostId, PostThread, StoreError,
    ThreadAssembler,
};

/// One engine operation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Create a post.
    Post { commentable: bool },
    /// Comment on an existing post.
    CommentOnPost { target: Index },
    /// Reply to an existing comment.
    Reply { target: Index },
    /// Comment on an id that matches nothing.
    CommentOnMissing,
    /// Comment on an existing post with a NUL in the text.
    CommentWithNul { target: Index },
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => any::<bool>().prop_map(|commentable| Op::Post { commentable }),
        3 => any::<Index>().prop_map(|target| Op::CommentOnPost { target }),
        4 => any::<Index>().prop_map(|target| Op::Reply { target }),
        1 => Just(Op::CommentOnMissing),
        1 => any::<Index>().prop_map(|target| Op::CommentWithNul { target }),
    ]
}

/// What happened when a sequence was applied.
#[derive(Debug, Default)]
pub struct Applied {
    /// Created post ids, in creation order.
    pub posts: Vec<PostId>,
    /// Created comments, in creation order.
    pub comments: Vec<Comment>,
    /// Per-op outcome: `"ok"`, `"skip"`, or the error kind.
    pub outcomes: Vec<&'static str>,
}

pub fn error_kind(err: &StoreError) -> &'static str {
    match err {
        StoreError::PostNotFound(_) => "post_not_found",
        StoreError::CommentNotFound(_) => "comment_not_found",
        StoreError::ItemNotFound(_) => "item_not_found",
        StoreError::CommentingDisabled(_) => "commenting_disabled",
        StoreError::DuplicatePostId(_) => "duplicate_post",
        StoreError::DuplicateCommentId(_) => "duplicate_comment",
        StoreError::NulCharacter(_) => "nul_character",
        StoreError::BackendUnavailable(_) => "unavailable",
        StoreError::Database(_) => "database",
    }
}

/// Replay `ops` against `store`. Post ids and comment texts are derived
/// from `prefix` and the op index, so two backends fed the same sequence
/// see the same inputs.
pub async fn apply_ops<S: ContentStore + ?Sized>(store: &S, ops: &[Op], prefix: &str) -> Applied {
    let mut applied = Applied::default();

    for (i, op) in ops.iter().enumerate() {
        let text = format!("{prefix}-{i:04}");
        let result = match op {
            Op::Post { commentable } => store
                .create_post(PostId::new(format!("{prefix}-post-{i:04}")), text, *commentable, "author".into())
                .await
                .map(|post| applied.posts.push(post.id)),
            Op::CommentOnPost { target } => {
                if applied.posts.is_empty() {
                    applied.outcomes.push("skip");
                    continue;
                }
                let post_id = applied.posts[target.index(applied.posts.len())].clone();
                store
                    .create_comment(text, post_id.as_str(), format!("user-{}", i % 3))
                    .await
                    .map(|c| applied.comments.push(c))
            }
            Op::Reply { target } => {
                if applied.comments.is_empty() {
                    applied.outcomes.push("skip");
                    continue;
                }
                let parent_id = applied.comments[target.index(applied.comments.len())].id.clone();
                store
                    .create_comment(text, parent_id.as_str(), format!("user-{}", i % 3))
                    .await
                    .map(|c| applied.comments.push(c))
            }
            Op::CommentOnMissing => store
                .create_comment(text, &format!("{prefix}-missing"), "author".into())
                .await
                .map(|c| applied.comments.push(c)),
            Op::CommentWithNul { target } => {
                if applied.posts.is_empty() {
                    applied.outcomes.push("skip");
                    continue;
                }
                let post_id = applied.posts[target.index(applied.posts.len())].clone();
                store
                    .create_comment(format!("{text}\0"), post_id.as_str(), "author".into())
                    .await
                    .map(|c| applied.comments.push(c))
            }
        };

        applied.outcomes.push(match result {
            Ok(()) => "ok",
            Err(ref e) => error_kind(e),
        });
    }

    applied
}

/// Tree node with storage-assigned ids removed; children sorted by text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Shape {
    pub text: String,
    pub author: String,
    pub children: Vec<Shape>,
}

pub fn comment_shape(thread: &CommentThread) -> Shape {
    let mut children: Vec<Shape> = thread.replies.iter().map(comment_shape).collect();
    children.sort();
    Shape {
        text: thread.comment.text.clone(),
        author: thread.comment.author.clone(),
        children,
    }
}

pub fn post_shape(thread: &PostThread) -> (String, bool, Vec<Shape>) {
    let mut comments: Vec<Shape> = thread.comments.iter().map(comment_shape).collect();
    comments.sort();
    (thread.post.text.clone(), thread.post.commentable, comments)
}

/// Assemble the full (unpaginated) thread of each post.
pub async fn threads_of<S: ContentStore + ?Sized>(
    assembler: &ThreadAssembler<S>,
    posts: &[PostId],
) -> Vec<PostThread> {
    let mut threads = Vec::with_capacity(posts.len());
    for id in posts {
        threads.push(
            assembler
                .post_thread(id, Page::ALL, &Cancellation::never())
                .await
                .expect("post created by this sequence"),
        );
    }
    threads
}

/// Assemble the full (unpaginated) reply tree of each comment.
pub async fn comment_threads_of<S: ContentStore + ?Sized>(
    assembler: &ThreadAssembler<S>,
    comments: &[Comment],
) -> Vec<CommentThread> {
    let mut threads = Vec::with_capacity(comments.len());
    for comment in comments {
        threads.push(
            assembler
                .comment_thread(&comment.id, Page::ALL, &Cancellation::never())
                .await
                .expect("comment created by this sequence"),
        );
    }
    threads
}

/// Sorted texts of each post's top-level comments.
pub async fn top_level_texts<S: ContentStore + ?Sized>(
    store: &S,
    posts: &[PostId],
) -> Vec<Vec<String>> {
    let mut listings = Vec::with_capacity(posts.len());
    for id in posts {
        let mut texts: Vec<String> = store
            .get_comments_by_post_id(id, Page::ALL)
            .await
            .expect("listing never fails for a created post")
            .into_iter()
            .map(|c| c.text)
            .collect();
        texts.sort();
        listings.push(texts);
    }
    listings
}
