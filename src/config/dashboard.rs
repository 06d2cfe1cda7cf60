//! Dashboard poller configuration

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the dashboard reads the consumer report and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Consumer `/reporte` endpoint
    pub report_url: String,
    /// Pause between refresh cycles
    pub refresh_interval_seconds: u64,
    /// Timeout for a single GET
    pub fetch_timeout_seconds: u64,
    /// GET attempts per refresh cycle
    pub fetch_attempts: u32,
    /// Pause between failed GET attempts
    pub fetch_retry_delay_seconds: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            report_url: "http://analiticas:5000/reporte".to_string(),
            refresh_interval_seconds: 5,
            fetch_timeout_seconds: 5,
            fetch_attempts: 5,
            fetch_retry_delay_seconds: 10,
        }
    }
}

impl DashboardConfig {
    /// Retry policy for a single report fetch.
    pub fn fetch_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fetch_attempts,
            Duration::from_secs(self.fetch_retry_delay_seconds),
        )
    }
}
