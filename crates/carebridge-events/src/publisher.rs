//! Best-effort event publishing.
//!
//! [`EventPublisher::publish`] never fails. Serialization errors, stream
//! errors, timeouts and a full queue are logged with the event's identifying
//! fields and counted, and the call returns normally. There is no retry and no
//! dead-letter queue: delivery is at-most-once.
//!
//! Two dispatch modes exist:
//!
//! - **Inline**: the stream send runs on the caller's task, bounded by the
//!   publish timeout.
//! - **Background**: the event is put on a bounded queue and a worker task
//!   sends it. A full queue drops the event. [`EventPublisher::shutdown`]
//!   closes the queue and drains it within the drain timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use carebridge_core::PatientEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::{DispatchMode, EventsConfig};
use crate::error::EventError;
use crate::stream::{EventStream, StreamMessage};

/// What happened to one published event, as far as the caller can tell.
///
/// Purely informational: the onboarding flow records it in its final state
/// and carries on either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The stream accepted the event.
    Delivered,
    /// The event is on the background queue.
    Queued,
    /// The event was lost. The reason has been logged.
    Failed,
}

impl Delivery {
    pub fn is_failed(self) -> bool {
        self == Delivery::Failed
    }
}

/// A queued event plus the fields needed to log its fate.
struct Envelope {
    message: StreamMessage,
    patient_id: String,
    event_type: String,
}

struct Dispatcher {
    stream: Arc<dyn EventStream>,
    publish_timeout: Duration,
    pending: AtomicUsize,
}

impl Dispatcher {
    async fn deliver(&self, envelope: Envelope) -> Delivery {
        let Envelope {
            message,
            patient_id,
            event_type,
        } = envelope;
        let topic = message.topic.clone();

        let result = match tokio::time::timeout(self.publish_timeout, self.stream.send(message)).await
        {
            Ok(result) => result,
            Err(_) => Err(EventError::PublishTimeout {
                topic: topic.clone(),
                after: self.publish_timeout,
            }),
        };

        match result {
            Ok(()) => {
                metrics::counter!("carebridge_events_published_total").increment(1);
                tracing::debug!(%patient_id, %event_type, %topic, "Event published");
                Delivery::Delivered
            }
            Err(e) => {
                metrics::counter!("carebridge_events_publish_failed_total").increment(1);
                tracing::error!(
                    %patient_id,
                    %event_type,
                    %topic,
                    transient = e.is_transient(),
                    error = %e,
                    "Event publish failed"
                );
                Delivery::Failed
            }
        }
    }
}

/// Publishes patient events to a fixed topic.
///
/// Process-wide; share it behind an `Arc`.
pub struct EventPublisher {
    dispatcher: Arc<Dispatcher>,
    topic: String,
    mode: DispatchMode,
    capacity: usize,
    drain_timeout: Duration,
    queue: Mutex<Option<mpsc::Sender<Envelope>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventPublisher {
    /// Publisher that sends on the caller's task.
    pub fn inline(
        stream: Arc<dyn EventStream>,
        topic: impl Into<String>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher {
                stream,
                publish_timeout,
                pending: AtomicUsize::new(0),
            }),
            topic: topic.into(),
            mode: DispatchMode::Inline,
            capacity: 0,
            drain_timeout: Duration::ZERO,
            queue: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Publisher with a background worker. Must be called inside a Tokio
    /// runtime.
    pub fn background(
        stream: Arc<dyn EventStream>,
        topic: impl Into<String>,
        publish_timeout: Duration,
        capacity: usize,
        drain_timeout: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        let dispatcher = Arc::new(Dispatcher {
            stream,
            publish_timeout,
            pending: AtomicUsize::new(0),
        });
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(Arc::clone(&dispatcher), receiver));

        Self {
            dispatcher,
            topic: topic.into(),
            mode: DispatchMode::Background,
            capacity,
            drain_timeout,
            queue: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Builds the publisher the config asks for.
    pub fn from_config(stream: Arc<dyn EventStream>, config: &EventsConfig) -> Self {
        tracing::info!(
            backend = stream.name(),
            topic = %config.topic,
            dispatch = ?config.dispatch,
            publish_timeout_ms = config.publish_timeout.as_millis() as u64,
            "Event publisher created"
        );

        match config.dispatch {
            DispatchMode::Inline => Self::inline(stream, &config.topic, config.publish_timeout),
            DispatchMode::Background => Self::background(
                stream,
                &config.topic,
                config.publish_timeout,
                config.queue_capacity,
                config.drain_timeout,
            ),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Publishes one event. Never fails and never panics.
    ///
    /// The message key is the patient id, so all events of one patient land
    /// in the same partition.
    pub async fn publish(&self, event: &PatientEvent) -> Delivery {
        let payload = match event.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                let err = EventError::SerializationFailed {
                    event_type: event.event_type.clone(),
                    cause: e.to_string(),
                };
                metrics::counter!("carebridge_events_publish_failed_total").increment(1);
                tracing::error!(
                    patient_id = %event.patient_id,
                    event_type = %event.event_type,
                    topic = %self.topic,
                    error = %err,
                    "Event publish failed"
                );
                return Delivery::Failed;
            }
        };

        let envelope = Envelope {
            message: StreamMessage {
                topic: self.topic.clone(),
                key: event.patient_id.clone(),
                payload,
            },
            patient_id: event.patient_id.clone(),
            event_type: event.event_type.clone(),
        };

        match self.mode {
            DispatchMode::Inline => self.dispatcher.deliver(envelope).await,
            DispatchMode::Background => self.enqueue(envelope),
        }
    }

    fn enqueue(&self, envelope: Envelope) -> Delivery {
        let queue = self.queue.lock();
        let Some(sender) = queue.as_ref() else {
            return self.drop_event(&envelope, &EventError::Closed);
        };

        self.dispatcher.pending.fetch_add(1, Ordering::SeqCst);
        match sender.try_send(envelope) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(envelope)) => {
                self.dispatcher.pending.fetch_sub(1, Ordering::SeqCst);
                self.drop_event(
                    &envelope,
                    &EventError::QueueFull {
                        capacity: self.capacity,
                    },
                )
            }
            Err(TrySendError::Closed(envelope)) => {
                self.dispatcher.pending.fetch_sub(1, Ordering::SeqCst);
                self.drop_event(&envelope, &EventError::Closed)
            }
        }
    }

    fn drop_event(&self, envelope: &Envelope, err: &EventError) -> Delivery {
        metrics::counter!("carebridge_events_dropped_total").increment(1);
        tracing::warn!(
            patient_id = %envelope.patient_id,
            event_type = %envelope.event_type,
            topic = %envelope.message.topic,
            error = %err,
            "Event dropped"
        );
        Delivery::Failed
    }

    /// Events accepted by the queue but not yet handed to the stream.
    pub fn pending(&self) -> usize {
        self.dispatcher.pending.load(Ordering::SeqCst)
    }

    /// Stops accepting events, drains the queue and flushes the stream.
    ///
    /// Events still queued when the drain timeout expires are counted as
    /// dropped. Safe to call more than once.
    pub async fn shutdown(&self) {
        let sender = self.queue.lock().take();
        drop(sender);

        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            match tokio::time::timeout(self.drain_timeout, &mut worker).await {
                Ok(_) => tracing::debug!("Event queue drained"),
                Err(_) => {
                    worker.abort();
                    let lost = self.dispatcher.pending.swap(0, Ordering::SeqCst);
                    metrics::counter!("carebridge_events_dropped_total").increment(lost as u64);
                    tracing::warn!(
                        lost,
                        drain_timeout_ms = self.drain_timeout.as_millis() as u64,
                        "Event queue not drained before timeout"
                    );
                }
            }
        }

        let flush_timeout = self.drain_timeout.max(self.dispatcher.publish_timeout);
        if let Err(e) = self.dispatcher.stream.flush(flush_timeout).await {
            tracing::warn!(error = %e, "Event stream flush failed");
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("backend", &self.dispatcher.stream.name())
            .field("topic", &self.topic)
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish()
    }
}

async fn run_worker(dispatcher: Arc<Dispatcher>, mut receiver: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = receiver.recv().await {
        dispatcher.deliver(envelope).await;
        dispatcher.pending.fetch_sub(1, Ordering::SeqCst);
    }
    tracing::debug!("Event dispatch worker stopped");
}
