//! # Metrics
//!
//! Prometheus export shared by the three services. Each service records
//! counters through the `metrics` facade and serves them on `GET /metrics`.
//!
//! **Counters:**
//! - `relay_messages_published_total` - Messages accepted by the broker (publisher)
//! - `relay_publish_failures_total{reason}` - Rejected or failed sends (publisher)
//! - `relay_messages_received_total` - Deliveries appended to the log (consumer)
//! - `relay_messages_rejected_total` - Deliveries that were not valid UTF-8 (consumer)
//! - `relay_report_fetch_failures_total` - Refresh cycles that exhausted retries (dashboard)
//! - `relay_snapshot_refreshes_total` - Snapshot replacements (dashboard)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub const MESSAGES_PUBLISHED: &str = "relay_messages_published_total";
pub const PUBLISH_FAILURES: &str = "relay_publish_failures_total";
pub const MESSAGES_RECEIVED: &str = "relay_messages_received_total";
pub const MESSAGES_REJECTED: &str = "relay_messages_rejected_total";
pub const REPORT_FETCH_FAILURES: &str = "relay_report_fetch_failures_total";
pub const SNAPSHOT_REFRESHES: &str = "relay_snapshot_refreshes_total";

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder once and return its handle.
///
/// If another recorder is already installed (several routers built in one
/// test binary, for instance), a detached handle is returned instead; it
/// renders an empty exposition.
pub fn metrics_handle() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "Metrics recorder already installed");
                    PrometheusBuilder::new().build_recorder().handle()
                })
        })
        .clone()
}

/// Prometheus text exposition response.
pub fn render(handle: &PrometheusHandle) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
