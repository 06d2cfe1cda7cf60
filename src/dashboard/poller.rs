//! Background refresh of the dashboard snapshot from the consumer report.

use super::Snapshot;
use crate::config::DashboardConfig;
use crate::consumer::ReportResponse;
use crate::retry::{RetryError, RetryPolicy};
use crate::telemetry;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors from a single GET of the consumer report. All are retryable.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timeout after {0}s")]
    Timeout(u64),

    #[error("report endpoint answered HTTP {0}")]
    Status(u16),

    #[error("invalid report body: {0}")]
    Decode(String),
}

/// What one refresh cycle did to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot replaced with this many messages
    Replaced(usize),
    /// Consumer had no messages; previous snapshot kept
    Empty,
    /// Every attempt failed; previous snapshot kept
    Failed,
}

/// Periodically copies the consumer's `/reporte` into a [`Snapshot`].
pub struct ReportPoller {
    client: reqwest::Client,
    report_url: String,
    timeout_seconds: u64,
    fetch_policy: RetryPolicy,
    interval: Duration,
    snapshot: Arc<Snapshot>,
}

impl ReportPoller {
    /// Build a poller from configuration with its own HTTP client.
    pub fn new(config: &DashboardConfig, snapshot: Arc<Snapshot>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()?;

        Ok(Self::with_client(client, config, snapshot))
    }

    /// Build a poller around an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        config: &DashboardConfig,
        snapshot: Arc<Snapshot>,
    ) -> Self {
        Self {
            client,
            report_url: config.report_url.clone(),
            timeout_seconds: config.fetch_timeout_seconds,
            fetch_policy: config.fetch_policy(),
            interval: Duration::from_secs(config.refresh_interval_seconds),
            snapshot,
        }
    }

    /// Override the fetch retry policy.
    pub fn with_fetch_policy(mut self, policy: RetryPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Override the pause between refresh cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One GET of the report, without retry.
    pub async fn fetch_once(&self) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(&self.report_url)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let report: ReportResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(report.mensajes)
    }

    /// GET the report under the fetch retry policy.
    pub async fn fetch_report(&self) -> Result<Vec<String>, RetryError<FetchError>> {
        self.fetch_policy.run(|| self.fetch_once(), |_| true).await
    }

    /// Run one refresh cycle. Only a non-empty report replaces the snapshot.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        match self.fetch_report().await {
            Ok(messages) if messages.is_empty() => {
                tracing::info!(
                    cached = self.snapshot.len(),
                    "Consumer has no messages yet, keeping cached snapshot"
                );
                RefreshOutcome::Empty
            }
            Ok(messages) => {
                let count = messages.len();
                self.snapshot.replace(messages);
                metrics::counter!(telemetry::SNAPSHOT_REFRESHES).increment(1);
                tracing::info!(messages = count, "Snapshot refreshed");
                RefreshOutcome::Replaced(count)
            }
            Err(e) => {
                metrics::counter!(telemetry::REPORT_FETCH_FAILURES).increment(1);
                tracing::error!(
                    url = %self.report_url,
                    error = %e,
                    "Could not refresh messages, keeping cached snapshot"
                );
                RefreshOutcome::Failed
            }
        }
    }

    /// Start the refresh loop. Returns a JoinHandle that resolves when the
    /// poller stops.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                url = %self.report_url,
                interval_seconds = self.interval.as_secs(),
                "Report poller started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    outcome = self.refresh_once() => {
                        tracing::debug!(?outcome, "Refresh cycle completed");
                    }
                }

                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }

            tracing::info!("Report poller shutting down");
        })
    }

    fn classify_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout_seconds)
        } else {
            FetchError::Request(e.to_string())
        }
    }
}
