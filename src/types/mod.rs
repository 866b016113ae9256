//! Core types for the thread kernel.

pub mod post;
pub mod comment;
pub mod page;
pub mod thread;

pub use post::{Post, PostId};
pub use comment::{Comment, CommentId};
pub use page::Page;
pub use thread::{CommentThread, PostThread};
