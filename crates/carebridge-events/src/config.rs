//! Event publishing configuration.

use std::time::Duration;

use carebridge_core::PATIENT_TOPIC;
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Upper bound for `publish_timeout`.
pub const MAX_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Which stream client carries the events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackend {
    /// In-process buffer; nothing leaves the process.
    #[default]
    Memory,
    /// Kafka producer (requires the `kafka` feature).
    Kafka,
}

/// Where the publish work runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the onboarding task, bounded by `publish_timeout`.
    #[default]
    Inline,
    /// On a worker task fed by a bounded queue.
    Background,
}

/// ```toml
/// [events]
/// backend = "kafka"
/// brokers = "localhost:9092"
/// topic = "patient"
/// publish_timeout = "500ms"
/// dispatch = "background"
/// queue_capacity = 1024
/// drain_timeout = "5s"
/// memory_retention = 1024
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EventsConfig {
    pub backend: StreamBackend,

    /// Comma-separated `host:port` list.
    pub brokers: String,

    pub topic: String,

    /// Budget for handing one event to the stream.
    #[serde(with = "humantime_serde")]
    pub publish_timeout: Duration,

    pub dispatch: DispatchMode,

    /// Background queue size. Events beyond it are dropped.
    pub queue_capacity: usize,

    /// How long shutdown waits for queued events.
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,

    /// Messages the memory backend keeps for inspection; older ones are
    /// discarded.
    pub memory_retention: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            backend: StreamBackend::Memory,
            brokers: "localhost:9092".to_string(),
            topic: PATIENT_TOPIC.to_string(),
            publish_timeout: Duration::from_millis(500),
            dispatch: DispatchMode::Inline,
            queue_capacity: 1024,
            drain_timeout: Duration::from_secs(5),
            memory_retention: 1024,
        }
    }
}

impl EventsConfig {
    pub fn validate(&self) -> Result<(), EventError> {
        if self.topic.trim().is_empty() {
            return Err(EventError::config_invalid("events.topic", "must not be empty"));
        }
        if self.backend == StreamBackend::Kafka && self.brokers.trim().is_empty() {
            return Err(EventError::config_invalid(
                "events.brokers",
                "required for the kafka backend",
            ));
        }
        if self.publish_timeout.is_zero() || self.publish_timeout > MAX_PUBLISH_TIMEOUT {
            return Err(EventError::config_invalid(
                "events.publish_timeout",
                format!("must be in (0, {}s]", MAX_PUBLISH_TIMEOUT.as_secs()),
            ));
        }
        if self.backend == StreamBackend::Memory && self.memory_retention == 0 {
            return Err(EventError::config_invalid(
                "events.memory_retention",
                "must be greater than zero",
            ));
        }
        if self.dispatch == DispatchMode::Background && self.queue_capacity == 0 {
            return Err(EventError::config_invalid(
                "events.queue_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EventsConfig::default();
        assert_eq!(config.topic, "patient");
        assert_eq!(config.backend, StreamBackend::Memory);
        assert_eq!(config.dispatch, DispatchMode::Inline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_publish_timeout_bounds() {
        let mut config = EventsConfig {
            publish_timeout: Duration::from_secs(6),
            ..EventsConfig::default()
        };
        assert!(config.validate().is_err());

        config.publish_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_background_needs_capacity() {
        let config = EventsConfig {
            dispatch: DispatchMode::Background,
            queue_capacity: 0,
            ..EventsConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[test]
    fn test_memory_backend_needs_retention() {
        let config = EventsConfig {
            memory_retention: 0,
            ..EventsConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("memory_retention"));
    }

    #[test]
    fn test_deserialize_lowercase_enums() {
        let config: EventsConfig = serde_json::from_str(
            r#"{"backend": "kafka", "dispatch": "background", "publish_timeout": "1s"}"#,
        )
        .unwrap();
        assert_eq!(config.backend, StreamBackend::Kafka);
        assert_eq!(config.dispatch, DispatchMode::Background);
        assert_eq!(config.publish_timeout, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 1024);
    }
}
