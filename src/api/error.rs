//! Error responses shared by the HTTP services.
//!
//! Every error body has the same two-field shape:
//!
//! ```json
//! { "status": "Error", "details": "Field 'message' is required" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Value of the `status` field on every error body.
pub const ERROR_STATUS: &str = "Error";

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub details: String,
}

/// An error returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status_code: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status_code: StatusCode, details: impl Into<String>) -> Self {
        Self {
            status_code,
            body: ErrorBody {
                status: ERROR_STATUS.to_string(),
                details: details.into(),
            },
        }
    }

    /// Client input error (400).
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, details)
    }

    /// Server-side failure (500).
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, details)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn details(&self) -> &str {
        &self.body.details
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.body.details, self.status_code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_status() {
        let err = ApiError::bad_request("Message cannot be empty");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details(), "Message cannot be empty");
    }

    #[test]
    fn test_internal_status() {
        let err = ApiError::internal("connection failed: refused");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody {
            status: ERROR_STATUS.to_string(),
            details: "boom".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"status": "Error", "details": "boom"}));
    }

    #[tokio::test]
    async fn test_into_response_carries_status_and_body() {
        let response = ApiError::bad_request("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "Error");
        assert_eq!(body.details, "bad");
    }
}
