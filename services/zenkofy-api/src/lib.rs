//! Zenkofy API
//!
//! HTTP service behind the Zenkofy PDF reader.
//!
//! ## REST Endpoints
//!
//! - `GET /api/pdfs` - List the caller's documents (`status`, `search`, `tag` filters)
//! - `PATCH /api/pdfs` - Update status, progress or tags
//! - `DELETE /api/pdfs?id=` - Delete a document and its stored file
//! - `GET /api/pdf/{id}` - Get one document
//! - `PATCH /api/pdf/{id}` - Update reading progress
//! - `GET|POST|DELETE /api/pdf/{id}/notes` - Notes on a document
//! - `GET|POST|DELETE /api/pdf/{id}/bookmarks` - Bookmarks on a document
//! - `POST /api/upload` - Multipart PDF upload
//! - `GET /api/analytics` - Reading statistics
//! - `GET /api/subscription` - Caller's active subscription
//! - `GET /api/plans` - Active Stripe plans
//! - `POST /api/checkout` - Create a Stripe checkout session
//! - `POST /webhooks/stripe` - Stripe webhook handler
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Service name, version and status
//! - `GET /ready` - Postgres reachability, 503 when down
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Multipart framing allowance on top of the file ceiling
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

/// Build the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();
    let upload_limit = state.config.max_upload_bytes + UPLOAD_BODY_OVERHEAD;

    // Library routes
    let api = Router::new()
        .route(
            "/pdfs",
            get(handlers::list_documents)
                .patch(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/pdf/{id}",
            get(handlers::get_document).patch(handlers::update_progress),
        )
        .route(
            "/pdf/{id}/notes",
            get(handlers::list_notes)
                .post(handlers::create_note)
                .delete(handlers::delete_note),
        )
        .route(
            "/pdf/{id}/bookmarks",
            get(handlers::list_bookmarks)
                .post(handlers::create_bookmark)
                .delete(handlers::delete_bookmark),
        )
        .route(
            "/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/analytics", get(handlers::get_analytics))
        // Billing routes
        .route("/subscription", get(handlers::get_subscription))
        .route("/plans", get(handlers::list_plans))
        .route("/checkout", post(handlers::create_checkout));

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes = Router::new().route("/webhooks/stripe", post(handlers::stripe_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api", api)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

/// Install the Prometheus recorder and describe the service metrics
pub fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Uploads dominate the tail; most calls finish well under 100ms
    let latency_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("zenkofy_operation_duration_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "zenkofy_webhooks_processed_total",
        "Total Stripe webhooks processed by status"
    );
    metrics::describe_counter!("zenkofy_uploads_total", "Total PDF uploads by result");
    metrics::describe_histogram!(
        "zenkofy_operation_duration_seconds",
        "Handler latency in seconds by operation and result"
    );

    Ok(handle)
}
