//! Background subscription that drains the queue into the message log.

use super::MessageLog;
use crate::broker::{BrokerError, Connector, Session};
use crate::retry::{RetryError, RetryPolicy};
use crate::telemetry;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Reasons the subscription stops with an error. All of them are fatal to
/// the consumer process.
#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("could not connect to broker at {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: RetryError<BrokerError>,
    },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("broker closed the delivery stream")]
    StreamEnded,
}

/// Long-lived consumer of the relay queue.
pub struct Subscriber {
    connector: Arc<dyn Connector>,
    queue: String,
    policy: RetryPolicy,
    log: Arc<MessageLog>,
}

impl Subscriber {
    pub fn new(
        connector: Arc<dyn Connector>,
        queue: impl Into<String>,
        policy: RetryPolicy,
        log: Arc<MessageLog>,
    ) -> Self {
        Self {
            connector,
            queue: queue.into(),
            policy,
            log,
        }
    }

    /// Spawn the subscription. The handle resolves to `Ok` after a clean
    /// shutdown through `cancel_token` and to `Err` on any fatal failure.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<Result<(), SubscriberError>> {
        tokio::spawn(self.run(cancel_token))
    }

    /// Connect (with retry), declare the queue, then append every delivery
    /// until cancelled.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<(), SubscriberError> {
        let target = self.connector.target();
        tracing::info!(broker = %target, queue = %self.queue, "Connecting to broker");

        let connect = self.policy.run(
            || self.connector.connect(),
            BrokerError::is_connection_error,
        );
        let session = tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Subscriber cancelled before connecting");
                return Ok(());
            }
            result = connect => result.map_err(|source| SubscriberError::Connect {
                target: target.clone(),
                source,
            })?,
        };

        session.declare_queue(&self.queue).await?;
        let mut deliveries = session.consume(&self.queue).await?;

        tracing::info!(queue = %self.queue, "Waiting for messages");

        let outcome = loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Subscriber shutting down");
                    break Ok(());
                }
                delivery = deliveries.next() => match delivery {
                    Some(Ok(body)) => self.handle_delivery(body),
                    Some(Err(e)) => break Err(SubscriberError::Broker(e)),
                    None => break Err(SubscriberError::StreamEnded),
                },
            }
        };

        close_quietly(session.as_ref()).await;
        outcome
    }

    /// Decode one delivery and append it. The delivery is already
    /// acknowledged; a body that is not UTF-8 is counted and dropped.
    fn handle_delivery(&self, body: Vec<u8>) {
        match String::from_utf8(body) {
            Ok(message) => {
                tracing::info!(body = %message, "Received message");
                self.log.append(message);
                metrics::counter!(telemetry::MESSAGES_RECEIVED).increment(1);
            }
            Err(e) => {
                tracing::warn!(
                    bytes = e.as_bytes().len(),
                    error = %e.utf8_error(),
                    "Dropping delivery that is not valid UTF-8"
                );
                self.log.record_rejected();
                metrics::counter!(telemetry::MESSAGES_REJECTED).increment(1);
            }
        }
    }
}

async fn close_quietly(session: &dyn Session) {
    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "Ignoring error while closing broker session");
    }
}
