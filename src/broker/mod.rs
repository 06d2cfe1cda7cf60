//! Message broker abstraction.
//!
//! The services talk to the broker through two small traits so that the
//! retry and subscription logic can run against RabbitMQ in production
//! ([`AmqpConnector`]) and against an in-process queue in tests
//! ([`MemoryBroker`]).
//!
//! A [`Connector`] opens a [`Session`] (connection plus one channel). A
//! session declares the queue, publishes through the default exchange with
//! the queue name as routing key, and consumes with automatic
//! acknowledgment.

mod amqp;
mod error;
pub mod memory;

pub use amqp::AmqpConnector;
pub use error::BrokerError;
pub use memory::MemoryBroker;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of raw message bodies delivered by the broker.
pub type Deliveries = BoxStream<'static, Result<Vec<u8>, BrokerError>>;

/// Opens sessions against a broker.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection and open a channel on it.
    async fn connect(&self) -> Result<Box<dyn Session>, BrokerError>;

    /// Human-readable target for log lines (never includes credentials).
    fn target(&self) -> String;
}

/// An open connection with a single channel.
#[async_trait]
pub trait Session: Send + Sync {
    /// Declare `queue`. A no-op when the queue already exists.
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Publish `payload` to `queue` through the default exchange.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Subscribe to `queue` with automatic acknowledgment.
    async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), BrokerError>;
}
