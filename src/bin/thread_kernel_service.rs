//! Thread Kernel Service Binary
//!
//! Runs the post/comment engine as a REST API service:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `STORAGE_TYPE`: "memory" or "postgres" (default: memory)
//! - `DATABASE_URL`: PostgreSQL connection string (when STORAGE_TYPE=postgres)
//! - `PORT`: Service port (default: 8000)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! STORAGE_TYPE=postgres DATABASE_URL=postgresql://... cargo run --bin thread_kernel_service --features service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use thread_kernel::service::{create_router, metrics_middleware, ServiceState};
use thread_kernel::{ContentStore, InMemoryContentStore, KernelConfig, PostgresContentStore, StorageKind};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "thread_kernel_service=info,thread_kernel=info,tower_http=info,sqlx=warn".into()
    });

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "thread_kernel_service::access",
        request_id = %request_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Thread Kernel Service"
    );

    let config = KernelConfig::from_env()?;
    info!(storage = %config.storage, "Configuration loaded");

    // Keep the concrete Postgres handle so the pool can be closed on shutdown
    let (store, postgres): (Arc<dyn ContentStore>, Option<Arc<PostgresContentStore>>) =
        match config.storage {
            StorageKind::Memory => (Arc::new(InMemoryContentStore::new()), None),
            StorageKind::Postgres => {
                info!("Connecting to PostgreSQL...");
                let connect_start = Instant::now();

                let store = match tokio::time::timeout(
                    std::time::Duration::from_secs(30),
                    PostgresContentStore::from_env(),
                )
                .await
                {
                    Ok(Ok(store)) => Arc::new(store),
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                        return Err(e.into());
                    }
                    Err(_) => {
                        tracing::error!("PostgreSQL connection timeout after 30s");
                        return Err("Database connection timeout".into());
                    }
                };

                info!(
                    latency_ms = connect_start.elapsed().as_millis() as u64,
                    "PostgreSQL connection established"
                );
                (store.clone() as Arc<dyn ContentStore>, Some(store))
            }
        };

    let state = ServiceState::new(store, config.storage);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(
        address = %addr,
        version = version,
        "Thread Kernel Service listening"
    );

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }
    };

    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    if let Some(postgres) = postgres {
        postgres.close().await;
        info!("PostgreSQL pool closed");
    }

    info!("Thread Kernel Service shutdown complete");

    Ok(())
}
