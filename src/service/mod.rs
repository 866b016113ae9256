//! Thread Kernel REST Service
//!
//! Exposes the post/comment engine over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /api/posts` - Create a post (the service generates its id)
//! - `GET /api/posts` - List posts with their comment trees
//! - `GET /api/posts/:id` - One post with its comment tree
//! - `POST /api/comments` - Comment on a post or reply to a comment
//! - `GET /api/comments` - List comments with their reply trees
//! - `GET /api/comments/:id` - One comment with its reply tree
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//!
//! List and tree endpoints accept `limit` and `offset` query parameters,
//! applied at every level of the tree.

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_thread_metrics};
pub use routes::create_router;
pub use state::ServiceState;
