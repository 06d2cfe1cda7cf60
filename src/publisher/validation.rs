//! Request body validation for `POST /send`.

use crate::api::ApiError;
use serde_json::Value;

pub const INVALID_BODY: &str = "Invalid body. Expected JSON with the message to send.";
pub const MISSING_MESSAGE: &str = "Field 'message' is required";
pub const MESSAGE_NOT_STRING: &str = "Field 'message' must be a string";
pub const EMPTY_MESSAGE: &str = "Message cannot be empty";

/// Extract the message to publish from a raw request body.
///
/// The body is parsed as JSON regardless of the declared content type. The
/// returned message is trimmed and never empty.
pub fn parse_message(body: &[u8]) -> Result<String, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request(INVALID_BODY))?;

    let message = match value.get("message") {
        None | Some(Value::Null) => return Err(ApiError::bad_request(MISSING_MESSAGE)),
        Some(Value::String(message)) => message,
        Some(_) => return Err(ApiError::bad_request(MESSAGE_NOT_STRING)),
    };

    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(EMPTY_MESSAGE));
    }

    Ok(trimmed.to_string())
}
