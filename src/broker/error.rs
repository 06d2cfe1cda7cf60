//! Error types for broker operations.

use thiserror::Error;

/// Errors that can occur while talking to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// TCP/AMQP connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Connection opened but no channel could be created
    #[error("channel open failed: {0}")]
    Channel(String),

    /// Queue declaration rejected
    #[error("queue declare failed for '{queue}': {message}")]
    Declare { queue: String, message: String },

    /// Publish rejected or not confirmed
    #[error("publish failed: {0}")]
    Publish(String),

    /// Subscription failed or a delivery errored
    #[error("consume failed: {0}")]
    Consume(String),

    /// Closing the connection failed
    #[error("close failed: {0}")]
    Close(String),
}

impl BrokerError {
    /// Errors raised while establishing a session. These are the only ones
    /// retried by the connect policy.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, BrokerError::Connect(_) | BrokerError::Channel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_classified() {
        assert!(BrokerError::Connect("refused".to_string()).is_connection_error());
        assert!(BrokerError::Channel("closed".to_string()).is_connection_error());
        assert!(!BrokerError::Publish("nack".to_string()).is_connection_error());
        assert!(!BrokerError::Consume("gone".to_string()).is_connection_error());
    }

    #[test]
    fn test_declare_display() {
        let err = BrokerError::Declare {
            queue: "hello".to_string(),
            message: "access refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "queue declare failed for 'hello': access refused"
        );
    }
}
