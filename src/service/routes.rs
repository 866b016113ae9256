//! Axum routes for the Thread Kernel service.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::assembler::{AssemblyError, Cancellation};
use crate::store::{ContentStore, StoreError};
use crate::types::{Comment, CommentId, CommentThread, Page, Post, PostId, PostThread};
use crate::THREAD_KERNEL_SCHEMA_VERSION;

use super::middleware::record_thread_metrics;
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    /// Body text.
    pub text: String,
    /// Author identity.
    pub author: String,
    /// Whether the post accepts top-level comments.
    pub commentable: bool,
}

/// Request to create a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    /// Body text.
    pub text: String,
    /// Post id (top-level comment) or comment id (reply).
    pub item_id: String,
    /// Author identity.
    pub author: String,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub schema_version: String,
    pub storage: String,
    pub backend_reachable: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub backend: bool,
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Rejection carrying an HTTP status and JSON error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<AssemblyError> for ApiError {
    fn from(err: AssemblyError) -> Self {
        let (status, code) = match &err {
            AssemblyError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            AssemblyError::Store(store_err) => match store_err {
                StoreError::PostNotFound(_) => (StatusCode::NOT_FOUND, "POST_NOT_FOUND"),
                StoreError::CommentNotFound(_) => (StatusCode::NOT_FOUND, "COMMENT_NOT_FOUND"),
                StoreError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "ITEM_NOT_FOUND"),
                StoreError::CommentingDisabled(_) => (StatusCode::FORBIDDEN, "COMMENTING_DISABLED"),
                StoreError::DuplicatePostId(_) | StoreError::DuplicateCommentId(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ID")
                }
                StoreError::NulCharacter(_) => (StatusCode::BAD_REQUEST, "INVALID_TEXT"),
                StoreError::BackendUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
                }
                StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
        };

        Self {
            status,
            body: ErrorResponse::new(code, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(
            status = self.status.as_u16(),
            code = %self.body.code,
            error = %self.body.error,
            "Request error"
        );
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Route Handlers
// ============================================================================

/// Create a post under a freshly generated id.
async fn create_post_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state
        .assembler
        .create_post(PostId::generate(), request.text, request.commentable, request.author)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// List posts with their comment trees.
async fn list_posts_handler(
    State(state): State<Arc<ServiceState>>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PostThread>>> {
    let threads = state
        .assembler
        .post_threads(page, &Cancellation::never())
        .await?;

    let comment_count = threads.iter().map(PostThread::comment_count).sum();
    let max_depth = threads
        .iter()
        .flat_map(|t| t.comments.iter().map(CommentThread::depth))
        .max()
        .unwrap_or(0);
    record_thread_metrics(threads.len(), comment_count, max_depth);

    Ok(Json(threads))
}

/// Fetch one post with its comment tree.
async fn get_post_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult<Json<PostThread>> {
    let thread = state
        .assembler
        .post_thread(&PostId::from(id), page, &Cancellation::never())
        .await?;

    let max_depth = thread.comments.iter().map(CommentThread::depth).max().unwrap_or(0);
    record_thread_metrics(1, thread.comment_count(), max_depth);

    Ok(Json(thread))
}

/// Comment on a post or reply to a comment.
async fn create_comment_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .assembler
        .create_comment(request.text, &request.item_id, request.author)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// List comments with their reply trees.
async fn list_comments_handler(
    State(state): State<Arc<ServiceState>>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<CommentThread>>> {
    let threads = state
        .assembler
        .comment_threads(page, &Cancellation::never())
        .await?;
    Ok(Json(threads))
}

/// Fetch one comment with its reply tree.
async fn get_comment_handler(
    State(state): State<Arc<ServiceState>>,
    Path(id): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult<Json<CommentThread>> {
    let thread = state
        .assembler
        .comment_thread(&CommentId::from(id), page, &Cancellation::never())
        .await?;
    Ok(Json(thread))
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    let reachable = state.store().ping().await.is_ok();

    Json(HealthResponse {
        status: if reachable { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: THREAD_KERNEL_SCHEMA_VERSION.to_string(),
        storage: state.storage.to_string(),
        backend_reachable: reachable,
    })
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the backend answers a ping, 503 otherwise.
async fn readiness_handler(
    State(state): State<Arc<ServiceState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.store().ping().await {
        Ok(()) => Ok(Json(ReadinessResponse {
            ready: true,
            backend: true,
            details: None,
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                backend: false,
                details: Some(e.to_string()),
            }),
        )),
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the Thread Kernel service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Posts
        .route("/api/posts", get(list_posts_handler).post(create_post_handler))
        .route("/api/posts/:id", get(get_post_handler))
        // Comments
        .route("/api/comments", get(list_comments_handler).post(create_comment_handler))
        .route("/api/comments/:id", get(get_comment_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_post_comment_reply_roundtrip() {
        let router = create_router(ServiceState::in_memory());

        let (status, post) = send(
            &router,
            post_json("/api/posts", serde_json::json!({"text": "hello", "author": "alice", "commentable": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = post["id"].as_str().unwrap().to_string();

        let (status, comment) = send(
            &router,
            post_json("/api/comments", serde_json::json!({"text": "first", "item_id": post_id, "author": "bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = comment["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &router,
            post_json("/api/comments", serde_json::json!({"text": "reply", "item_id": comment_id, "author": "carol"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, thread) = send(&router, get(&format!("/api/posts/{post_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(thread["comments"][0]["id"], comment_id.as_str());
        assert_eq!(thread["comments"][0]["replies"][0]["text"], "reply");
        assert_eq!(thread["comments"][0]["replies"][0]["post_id"], post_id.as_str());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let router = create_router(ServiceState::in_memory());

        let (status, body) = send(&router, get("/api/posts/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "POST_NOT_FOUND");

        let (status, body) = send(
            &router,
            post_json("/api/comments", serde_json::json!({"text": "x", "item_id": "nowhere", "author": "bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ITEM_NOT_FOUND");

        let (_, post) = send(
            &router,
            post_json("/api/posts", serde_json::json!({"text": "quiet", "author": "alice", "commentable": false})),
        )
        .await;
        let (status, body) = send(
            &router,
            post_json("/api/comments", serde_json::json!({"text": "x", "item_id": post["id"], "author": "bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "COMMENTING_DISABLED");

        let (status, body) = send(
            &router,
            post_json("/api/posts", serde_json::json!({"text": "a\0b", "author": "alice", "commentable": true})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TEXT");
    }

    #[tokio::test]
    async fn test_list_pagination_query() {
        let router = create_router(ServiceState::in_memory());
        for i in 0..3 {
            send(
                &router,
                post_json("/api/posts", serde_json::json!({"text": format!("p{i}"), "author": "a", "commentable": true})),
            )
            .await;
        }

        let (_, all) = send(&router, get("/api/posts")).await;
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (_, page) = send(&router, get("/api/posts?limit=2&offset=2")).await;
        assert_eq!(page.as_array().unwrap().len(), 1);

        let (_, partial) = send(&router, get("/api/posts?limit=1")).await;
        assert_eq!(partial.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_health_probes() {
        let router = create_router(ServiceState::in_memory());

        let (status, body) = send(&router, get("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);

        let (_, body) = send(&router, get("/health")).await;
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["status"], "healthy");
    }
}
