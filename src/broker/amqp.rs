//! RabbitMQ implementation over `lapin`.

use super::{BrokerError, Connector, Deliveries, Session};
use crate::config::BrokerConfig;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};

/// Default exchange; routes by queue name.
const DEFAULT_EXCHANGE: &str = "";

const CONSUMER_TAG: &str = "relay-consumer";

/// Connects to RabbitMQ using the broker section of the config.
pub struct AmqpConnector {
    uri: String,
    target: String,
}

impl AmqpConnector {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            uri: config.amqp_uri(),
            target: format!("{}:{}", config.host, config.port),
        }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, BrokerError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Channel(e.to_string()))?;

        tracing::debug!(target_addr = %self.target, "Opened AMQP channel");

        Ok(Box::new(AmqpSession {
            connection,
            channel,
        }))
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}

struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl Session for AmqpSession {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map(|_| ())
            .map_err(|e| BrokerError::Declare {
                queue: queue.to_string(),
                message: e.to_string(),
            })
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.channel
            .basic_publish(
                DEFAULT_EXCHANGE,
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                CONSUMER_TAG,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| d.data)
                    .map_err(|e| BrokerError::Consume(e.to_string()))
            })
            .boxed())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.connection
            .close(200, "OK")
            .await
            .map_err(|e| BrokerError::Close(e.to_string()))
    }
}
