//! Consumer service.
//!
//! Drains the relay queue into an in-memory [`MessageLog`] and serves the
//! whole log on `GET /reporte`:
//!
//! ```json
//! { "mensajes": ["hola", "adios"] }
//! ```
//!
//! The subscription runs as a supervised background task ([`Subscriber`]);
//! the HTTP handlers only read.

mod log;
mod subscriber;

pub use log::MessageLog;
pub use subscriber::{Subscriber, SubscriberError};

use crate::api::{self, HealthResponse};
use crate::telemetry;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Body of `GET /reporte`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub mensajes: Vec<String>,
}

/// Shared state of the consumer's HTTP handlers.
pub struct ConsumerState {
    pub log: Arc<MessageLog>,
    pub started_at: Instant,
    pub metrics: PrometheusHandle,
}

impl ConsumerState {
    pub fn new(log: Arc<MessageLog>) -> Self {
        Self {
            log,
            started_at: Instant::now(),
            metrics: telemetry::metrics_handle(),
        }
    }
}

/// Counters reported on the consumer's `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerHealth {
    pub messages: usize,
    pub rejected: u64,
}

/// Create the consumer router.
pub fn create_router(state: Arc<ConsumerState>) -> Router {
    let router = Router::new()
        .route("/reporte", get(report))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state);
    api::with_common_layers(router)
}

/// GET /reporte - every message received so far, in arrival order.
async fn report(State(state): State<Arc<ConsumerState>>) -> Json<ReportResponse> {
    Json(ReportResponse {
        mensajes: state.log.snapshot(),
    })
}

/// GET /health
async fn health(State(state): State<Arc<ConsumerState>>) -> Json<HealthResponse<ConsumerHealth>> {
    Json(HealthResponse::ok(
        "consumer",
        state.started_at,
        ConsumerHealth {
            messages: state.log.len(),
            rejected: state.log.rejected(),
        },
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<Arc<ConsumerState>>) -> impl IntoResponse {
    telemetry::render(&state.metrics)
}
