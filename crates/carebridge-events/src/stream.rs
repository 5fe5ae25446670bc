//! Stream client abstraction and the in-memory stream.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::EventError;

/// Messages kept by [`MemoryStream::new`].
pub const DEFAULT_RETENTION: usize = 1024;

/// One keyed message bound for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// A durable event stream the publisher hands messages to.
///
/// Implementations are process-wide and shared across tasks.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Hands one message to the stream.
    async fn send(&self, message: StreamMessage) -> Result<(), EventError>;

    /// Waits for in-flight messages to leave the client.
    async fn flush(&self, _timeout: Duration) -> Result<(), EventError> {
        Ok(())
    }

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Stream that keeps the most recent messages in memory.
///
/// Used when no broker is configured and in tests. At most `retention`
/// messages are kept; the oldest is discarded first. Subscribers see messages
/// sent after they subscribed and lag after `retention` unread ones.
pub struct MemoryStream {
    messages: Mutex<VecDeque<StreamMessage>>,
    retention: usize,
    sender: broadcast::Sender<StreamMessage>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        let retention = retention.max(1);
        let (sender, _) = broadcast::channel(retention);
        Self {
            messages: Mutex::new(VecDeque::with_capacity(retention.min(DEFAULT_RETENTION))),
            retention,
            sender,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Snapshot of the retained messages, oldest first.
    pub fn messages(&self) -> Vec<StreamMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn messages_for(&self, topic: &str) -> Vec<StreamMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.sender.subscribe()
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStream")
            .field("messages", &self.len())
            .field("retention", &self.retention)
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

#[async_trait]
impl EventStream for MemoryStream {
    async fn send(&self, message: StreamMessage) -> Result<(), EventError> {
        {
            let mut messages = self.messages.lock();
            if messages.len() == self.retention {
                messages.pop_front();
            }
            messages.push_back(message.clone());
        }
        // No subscribers is not an error.
        let _ = self.sender.send(message);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str, key: &str) -> StreamMessage {
        StreamMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_memory_stream_records_messages() {
        let stream = MemoryStream::new();
        assert!(stream.is_empty());

        stream.send(message("patient", "p1")).await.unwrap();
        stream.send(message("audit", "p1")).await.unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.messages_for("patient"), vec![message("patient", "p1")]);
    }

    #[tokio::test]
    async fn test_memory_stream_history_is_bounded() {
        let stream = MemoryStream::with_retention(3);

        for i in 0..10 {
            stream.send(message("patient", &format!("p{i}"))).await.unwrap();
        }

        assert_eq!(stream.len(), 3);
        let keys: Vec<String> = stream.messages().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, ["p7", "p8", "p9"]);
    }

    #[tokio::test]
    async fn test_memory_stream_zero_retention_keeps_latest() {
        let stream = MemoryStream::with_retention(0);
        assert_eq!(stream.retention(), 1);

        stream.send(message("patient", "p1")).await.unwrap();
        stream.send(message("patient", "p2")).await.unwrap();

        assert_eq!(stream.messages(), vec![message("patient", "p2")]);
    }

    #[tokio::test]
    async fn test_memory_stream_subscribe() {
        let stream = MemoryStream::new();
        let mut receiver = stream.subscribe();

        stream.send(message("patient", "p1")).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.key, "p1");
    }

    #[tokio::test]
    async fn test_memory_stream_flush_is_noop() {
        let stream = MemoryStream::new();
        assert!(stream.flush(Duration::from_millis(10)).await.is_ok());
        assert_eq!(stream.name(), "memory");
    }
}
