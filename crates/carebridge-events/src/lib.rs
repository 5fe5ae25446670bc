//! # carebridge-events
//!
//! Fire-and-forget publishing of patient domain events.
//!
//! The publisher isolates stream failures from the onboarding flow: a broker
//! outage costs an event, never an onboarding. Events are protobuf-encoded
//! [`PatientEvent`](carebridge_core::PatientEvent)s keyed by patient id.
//!
//! ## Features
//!
//! - `kafka` - enables the Kafka backend (`rdkafka`, needs librdkafka)

pub mod config;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod publisher;
pub mod stream;

use std::sync::Arc;

pub use config::{DispatchMode, EventsConfig, MAX_PUBLISH_TIMEOUT, StreamBackend};
pub use error::EventError;
#[cfg(feature = "kafka")]
pub use kafka::KafkaStream;
pub use publisher::{Delivery, EventPublisher};
pub use stream::{EventStream, MemoryStream, StreamMessage};

/// Creates the stream client selected by `config.backend`.
pub fn build_stream(config: &EventsConfig) -> Result<Arc<dyn EventStream>, EventError> {
    config.validate()?;

    match config.backend {
        StreamBackend::Memory => {
            tracing::warn!("Events backend is in-memory; events will not leave this process");
            Ok(Arc::new(MemoryStream::with_retention(config.memory_retention)))
        }
        #[cfg(feature = "kafka")]
        StreamBackend::Kafka => Ok(Arc::new(KafkaStream::new(
            &config.brokers,
            config.publish_timeout,
        )?)),
        #[cfg(not(feature = "kafka"))]
        StreamBackend::Kafka => Err(EventError::ConfigInvalid {
            var: "events.backend".to_string(),
            reason: "kafka backend requires building with the `kafka` feature".to_string(),
        }),
    }
}
