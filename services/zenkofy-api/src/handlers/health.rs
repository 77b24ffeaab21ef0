//! `/health` and `/ready` endpoints for the Zenkofy API

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "zenkofy-api";

#[derive(Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct DependencyStatus {
    pub service: &'static str,
    pub status: &'static str,
    pub postgres: &'static str,
    pub postgres_latency_ms: u64,
}

/// GET /health
pub async fn health() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

/// GET /ready
///
/// 503 with the same body shape while Postgres cannot be reached, so load
/// balancers and humans read one format.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<DependencyStatus>) {
    let started = Instant::now();
    let outcome = state.repos.health.ping().await;
    let postgres_latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => (
            StatusCode::OK,
            Json(DependencyStatus {
                service: SERVICE_NAME,
                status: "ready",
                postgres: "up",
                postgres_latency_ms,
            }),
        ),
        Err(e) => {
            tracing::warn!(
                error = %e,
                latency_ms = postgres_latency_ms,
                "Postgres unreachable, not ready"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DependencyStatus {
                    service: SERVICE_NAME,
                    status: "unavailable",
                    postgres: "down",
                    postgres_latency_ms,
                }),
            )
        }
    }
}
