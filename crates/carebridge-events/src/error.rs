//! Error types for the carebridge-events crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while publishing events.
///
/// None of these reach the onboarding caller; the publisher logs and counts
/// them.
#[derive(Debug, Error)]
pub enum EventError {
    // Configuration errors (permanent)
    /// Configuration value is invalid.
    #[error("Configuration invalid for {var}: {reason}")]
    ConfigInvalid { var: String, reason: String },

    // Connection errors (transient)
    /// Failed to create the stream client.
    #[error("Connection to broker {broker} failed: {cause}")]
    ConnectionFailed { broker: String, cause: String },

    // Publishing errors
    /// Failed to serialize event.
    #[error("Failed to serialize event type {event_type}: {cause}")]
    SerializationFailed { event_type: String, cause: String },

    /// The stream rejected or lost the message.
    #[error("Failed to publish to topic {topic}: {cause}")]
    PublishFailed { topic: String, cause: String },

    /// The stream did not accept the message within the publish budget.
    #[error("Publishing to topic {topic} timed out after {after:?}")]
    PublishTimeout { topic: String, after: Duration },

    // Dispatch queue errors
    /// The background queue is at capacity.
    #[error("Dispatch queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The publisher has been shut down.
    #[error("Publisher is shut down")]
    Closed,
}

impl EventError {
    /// Returns true if this error is transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventError::ConnectionFailed { .. }
                | EventError::PublishFailed { .. }
                | EventError::PublishTimeout { .. }
                | EventError::QueueFull { .. }
        )
    }

    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, EventError::ConfigInvalid { .. })
    }

    pub(crate) fn config_invalid(var: &str, reason: impl Into<String>) -> Self {
        EventError::ConfigInvalid {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}
