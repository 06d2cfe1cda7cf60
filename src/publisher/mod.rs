//! Publisher service.
//!
//! Accepts `POST /send` with `{"message": "..."}` and relays the trimmed
//! message to the broker queue.
//!
//! ## Responses
//!
//! - `200 {"status":"Message sent","message":"<trimmed>"}`
//! - `400 {"status":"Error","details":"..."}` for invalid input; the broker
//!   is never contacted
//! - `500 {"status":"Error","details":"..."}` when the broker cannot be
//!   reached after the connect retries, or rejects the publish
//!
//! Each request opens its own connection: connect (retried), declare the
//! queue, publish once, close.

mod validation;

pub use validation::{parse_message, EMPTY_MESSAGE, INVALID_BODY, MESSAGE_NOT_STRING, MISSING_MESSAGE};

use crate::api::{self, ApiError, HealthResponse};
use crate::broker::{BrokerError, Connector, Session};
use crate::logging::generate_request_id;
use crate::retry::{RetryError, RetryPolicy};
use crate::telemetry;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

/// `status` value of a successful send.
pub const SENT_STATUS: &str = "Message sent";

/// Body of a successful `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub status: String,
    pub message: String,
}

/// Failures while relaying a valid message.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not connect to broker at {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: RetryError<BrokerError>,
    },

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Shared state of the publisher's HTTP handlers.
pub struct PublisherState {
    pub connector: Arc<dyn Connector>,
    pub queue: String,
    pub connect_policy: RetryPolicy,
    pub started_at: Instant,
    pub metrics: PrometheusHandle,
}

impl PublisherState {
    pub fn new(connector: Arc<dyn Connector>, queue: impl Into<String>, connect_policy: RetryPolicy) -> Self {
        Self {
            connector,
            queue: queue.into(),
            connect_policy,
            started_at: Instant::now(),
            metrics: telemetry::metrics_handle(),
        }
    }

    /// Open a session (with retry), declare the queue, publish `message`
    /// once, and close the session.
    pub async fn publish(&self, message: &str) -> Result<(), PublishError> {
        let session = self
            .connect_policy
            .run(|| self.connector.connect(), BrokerError::is_connection_error)
            .await
            .map_err(|source| PublishError::Connection {
                target: self.connector.target(),
                source,
            })?;

        let result = publish_on(session.as_ref(), &self.queue, message).await;

        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "Ignoring error while closing broker session");
        }
        result
    }
}

async fn publish_on(session: &dyn Session, queue: &str, message: &str) -> Result<(), PublishError> {
    session.declare_queue(queue).await?;
    session.publish(queue, message.as_bytes()).await?;
    Ok(())
}

/// Create the publisher router.
pub fn create_router(state: Arc<PublisherState>) -> Router {
    let router = Router::new()
        // Any valid message is accepted, whatever its size.
        .route("/send", post(send).layer(DefaultBodyLimit::disable()))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(state);
    api::with_common_layers(router)
}

/// POST /send - validate and relay one message.
async fn send(
    State(state): State<Arc<PublisherState>>,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let request_id = generate_request_id();
    let span = tracing::info_span!("send", request_id = %request_id);

    async move {
        let message = parse_message(&body).inspect_err(|e| {
            tracing::warn!(details = e.details(), "Rejected send request");
            metrics::counter!(telemetry::PUBLISH_FAILURES, "reason" => "invalid_input").increment(1);
        })?;

        match state.publish(&message).await {
            Ok(()) => {
                tracing::info!(queue = %state.queue, body = %message, "Message sent");
                metrics::counter!(telemetry::MESSAGES_PUBLISHED).increment(1);
                Ok(Json(SendResponse {
                    status: SENT_STATUS.to_string(),
                    message,
                }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to relay message");
                metrics::counter!(telemetry::PUBLISH_FAILURES, "reason" => "broker").increment(1);
                Err(ApiError::internal(e.to_string()))
            }
        }
    }
    .instrument(span)
    .await
}

/// Queue and broker target reported on `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherHealth {
    pub queue: String,
    pub broker: String,
}

/// GET /health
async fn health(State(state): State<Arc<PublisherState>>) -> Json<HealthResponse<PublisherHealth>> {
    Json(HealthResponse::ok(
        "publisher",
        state.started_at,
        PublisherHealth {
            queue: state.queue.clone(),
            broker: state.connector.target(),
        },
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<Arc<PublisherState>>) -> impl IntoResponse {
    telemetry::render(&state.metrics)
}
