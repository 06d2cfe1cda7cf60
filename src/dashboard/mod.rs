//! Dashboard service.
//!
//! A [`ReportPoller`] copies the consumer's `/reporte` into a local
//! [`Snapshot`] every few seconds; `GET /` renders that snapshot as an HTML
//! list. Failures to reach the consumer are logged and never surface to the
//! page: it keeps showing the last good copy.

mod page;
mod poller;
mod snapshot;

pub use page::{escape_html, render_page, PageError};
pub use poller::{FetchError, RefreshOutcome, ReportPoller};
pub use snapshot::Snapshot;

use crate::api::{self, HealthResponse};
use crate::telemetry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Shared state of the dashboard's HTTP handlers.
pub struct DashboardState {
    pub snapshot: Arc<Snapshot>,
    pub report_url: String,
    pub started_at: Instant,
    pub metrics: PrometheusHandle,
}

impl DashboardState {
    pub fn new(snapshot: Arc<Snapshot>, report_url: impl Into<String>) -> Self {
        Self {
            snapshot,
            report_url: report_url.into(),
            started_at: Instant::now(),
            metrics: telemetry::metrics_handle(),
        }
    }
}

/// Cache details reported on the dashboard's `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardHealth {
    pub report_url: String,
    pub cached_messages: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Create the dashboard router.
pub fn create_router(state: Arc<DashboardState>) -> Router {
    let router = Router::new()
        .route("/", get(dashboard_handler))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state);
    api::with_common_layers(router)
}

/// GET / - cached messages as an HTML list.
async fn dashboard_handler(State(state): State<Arc<DashboardState>>) -> Response {
    match render_page(&state.snapshot.messages()) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render dashboard");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /health
async fn health(State(state): State<Arc<DashboardState>>) -> Json<HealthResponse<DashboardHealth>> {
    Json(HealthResponse::ok(
        "dashboard",
        state.started_at,
        DashboardHealth {
            report_url: state.report_url.clone(),
            cached_messages: state.snapshot.len(),
            last_refresh: state.snapshot.refreshed_at(),
        },
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    telemetry::render(&state.metrics)
}
