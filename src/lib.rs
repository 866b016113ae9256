//! # thread-kernel
//!
//! Threaded post/comment storage engine.
//!
//! Posts own an unbounded-depth tree of comments. Comments are stored flat
//! with a parent pointer and a thread-root `post_id`; the nested tree is
//! rebuilt on every read.
//!
//! ## Architecture
//!
//! ```text
//! Caller → ThreadAssembler → ContentStore (Memory or Postgres)
//!               ↓
//!     PostThread / CommentThread
//! ```
//!
//! ## Core Contract
//!
//! 1. A post is created once under a caller-chosen id; `commentable` is fixed
//! 2. A comment targets a post (top-level) or a comment (reply); replies
//!    inherit the thread root of their parent
//! 3. Every list operation is paginated with the same all-or-nothing
//!    `limit`/`offset` rule, and the assembler applies the caller's page at
//!    every level of the tree
//! 4. Both backends produce identical results for identical operation sequences

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod assembler;
pub mod config;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{Post, PostId, Comment, CommentId, Page, PostThread, CommentThread};
pub use store::{ContentStore, StoreError, InMemoryContentStore};
#[cfg(feature = "postgres")]
pub use store::{PostgresContentStore, PostgresConfig, PoolStats};
pub use assembler::{ThreadAssembler, AssemblyError, Cancellation, CancelHandle};
pub use config::{KernelConfig, StorageKind, ConfigError};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Schema version of the persisted tables and serialized thread types.
/// Increment on breaking changes to either.
pub const THREAD_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
