//! Health check response shared by the services.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// `GET /health` body. Service-specific counters are flattened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse<T> {
    pub status: String,
    pub service: String,
    pub uptime_seconds: u64,
    #[serde(flatten)]
    pub details: T,
}

impl<T> HealthResponse<T> {
    pub fn ok(service: &str, started_at: Instant, details: T) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            uptime_seconds: started_at.elapsed().as_secs(),
            details,
        }
    }
}
