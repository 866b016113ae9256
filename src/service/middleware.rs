//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! Emitted as structured log events under the `thread_kernel::metrics` target:
//!
//! - `request_metric` - path pattern, method, status, latency
//! - `thread_metric` - comment count and depth of an assembled thread

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "thread_kernel::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record the shape of an assembled thread.
pub fn record_thread_metrics(roots: usize, comment_count: usize, max_depth: usize) {
    info!(
        target: "thread_kernel::metrics",
        metric_type = "thread",
        roots = roots,
        comment_count = comment_count,
        max_depth = max_depth,
        "thread_metric"
    );
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Post ids generated by the service are UUIDs; replace them with `:id`.
fn normalize_path(path: &str) -> String {
    static UUID: OnceLock<regex_lite::Regex> = OnceLock::new();
    let uuid_regex = UUID.get_or_init(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
        )
        .expect("static UUID pattern")
    });

    uuid_regex.replace_all(path, ":id").to_string()
}
