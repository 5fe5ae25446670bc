//! Kafka stream client.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info};

use crate::error::EventError;
use crate::stream::{EventStream, StreamMessage};

const CLIENT_ID: &str = "carebridge-patient-service";

/// Kafka producer behind the [`EventStream`] seam.
///
/// Creation does not contact the brokers; the connection is made in the
/// background by librdkafka.
pub struct KafkaStream {
    producer: FutureProducer,
    brokers: String,
    message_timeout: Duration,
}

impl KafkaStream {
    /// Create a producer for `brokers`.
    ///
    /// `message_timeout` bounds how long librdkafka keeps retrying one message
    /// internally before reporting it as failed.
    pub fn new(brokers: &str, message_timeout: Duration) -> Result<Self, EventError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", CLIENT_ID)
            .set("message.timeout.ms", message_timeout.as_millis().to_string())
            .set("acks", "all")
            .create()
            .map_err(|e| EventError::ConnectionFailed {
                broker: brokers.to_string(),
                cause: e.to_string(),
            })?;

        info!(bootstrap_servers = %brokers, client_id = CLIENT_ID, "Kafka producer created");

        Ok(Self {
            producer,
            brokers: brokers.to_string(),
            message_timeout,
        })
    }
}

impl std::fmt::Debug for KafkaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaStream")
            .field("brokers", &self.brokers)
            .field("message_timeout", &self.message_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStream for KafkaStream {
    async fn send(&self, message: StreamMessage) -> Result<(), EventError> {
        debug!(
            topic = %message.topic,
            key = %message.key,
            payload_size = message.payload.len(),
            "Producing message"
        );

        let record = FutureRecord::to(&message.topic)
            .key(&message.key)
            .payload(&message.payload);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.message_timeout))
            .await
            .map_err(|(err, _)| EventError::PublishFailed {
                topic: message.topic.clone(),
                cause: err.to_string(),
            })?;

        debug!(partition, offset, "Message delivered");
        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), EventError> {
        let producer = self.producer.clone();
        // librdkafka's flush blocks the calling thread.
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| EventError::PublishFailed {
                topic: "*".to_string(),
                cause: format!("flush task failed: {e}"),
            })?
            .map_err(|e| EventError::PublishFailed {
                topic: "*".to_string(),
                cause: e.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}
