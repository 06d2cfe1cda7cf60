//! HTTP building blocks shared by the publisher, consumer and dashboard:
//! the error envelope, the health body, and request tracing.

mod error;
mod health;

pub use error::{ApiError, ErrorBody, ERROR_STATUS};
pub use health::HealthResponse;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Wrap a service router with per-request tracing.
pub fn with_common_layers(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http())
}
