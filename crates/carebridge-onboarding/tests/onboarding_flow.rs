//! End-to-end onboarding with hand-written collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carebridge_billing::{
    AccountProvisioner, ProvisioningError, ProvisioningRequest, ProvisioningResponse,
};
use carebridge_core::{EVENT_TYPE_PATIENT_CREATED, NewPatient, PATIENT_TOPIC, PatientEvent};
use carebridge_events::{EventError, EventPublisher, EventStream, MemoryStream, StreamMessage};
use carebridge_onboarding::{
    InMemoryPatientRepository, OnboardingCoordinator, OnboardingError, PatientRepository,
};
use parking_lot::Mutex;

#[derive(Clone, Copy)]
enum Outcome {
    Account,
    SlowAccount,
    Unreachable,
    RemoteFailure,
    Timeout,
}

/// Provisioner that answers with a fixed outcome and records what it saw.
struct MockProvisioner {
    outcome: Outcome,
    stream: Arc<MemoryStream>,
    calls: Mutex<Vec<ProvisioningRequest>>,
    events_seen_at_call: Mutex<Vec<usize>>,
}

impl MockProvisioner {
    fn new(outcome: Outcome, stream: Arc<MemoryStream>) -> Self {
        Self {
            outcome,
            stream,
            calls: Mutex::new(Vec::new()),
            events_seen_at_call: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AccountProvisioner for MockProvisioner {
    async fn create_account(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningResponse, ProvisioningError> {
        self.events_seen_at_call.lock().push(self.stream.len());
        let n = {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            calls.len()
        };

        match self.outcome {
            Outcome::SlowAccount => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(ProvisioningResponse {
                    account_id: format!("ACC-{n}"),
                    status: "ACTIVE".to_string(),
                })
            }
            Outcome::Account => Ok(ProvisioningResponse {
                account_id: format!("ACC-{n}"),
                status: "ACTIVE".to_string(),
            }),
            Outcome::Unreachable => Err(ProvisioningError::unreachable(
                "http://localhost:9001",
                "connection refused",
            )),
            Outcome::RemoteFailure => Err(ProvisioningError::remote_failure(
                "Internal",
                "ledger locked",
            )),
            Outcome::Timeout => Err(ProvisioningError::timeout(Duration::from_secs(5))),
        }
    }
}

/// Stream whose every send fails.
struct BrokenStream;

#[async_trait]
impl EventStream for BrokenStream {
    async fn send(&self, message: StreamMessage) -> Result<(), EventError> {
        Err(EventError::PublishFailed {
            topic: message.topic,
            cause: "broker unavailable".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

struct Harness {
    coordinator: Arc<OnboardingCoordinator>,
    repository: Arc<InMemoryPatientRepository>,
    provisioner: Arc<MockProvisioner>,
    stream: Arc<MemoryStream>,
}

fn harness(outcome: Outcome) -> Harness {
    let stream = Arc::new(MemoryStream::new());
    let repository = Arc::new(InMemoryPatientRepository::new());
    let provisioner = Arc::new(MockProvisioner::new(outcome, stream.clone()));
    let publisher = Arc::new(EventPublisher::inline(
        stream.clone(),
        PATIENT_TOPIC,
        Duration::from_millis(500),
    ));
    let coordinator =
        OnboardingCoordinator::new(repository.clone(), provisioner.clone(), publisher);

    Harness {
        coordinator: Arc::new(coordinator),
        repository,
        provisioner,
        stream,
    }
}

fn jane() -> NewPatient {
    NewPatient::new("Jane", "jane@x.com")
}

#[tokio::test]
async fn test_successful_provisioning_publishes_one_event() {
    let h = harness(Outcome::Account);

    let onboarded = h.coordinator.onboard(jane()).await.unwrap();
    assert_eq!(onboarded.account.account_id, "ACC-1");
    assert_eq!(onboarded.record.name, "Jane");

    let messages = h.stream.messages_for(PATIENT_TOPIC);
    assert_eq!(messages.len(), 1);
    assert_eq!(h.stream.len(), 1);

    let event = PatientEvent::from_bytes(&messages[0].payload).unwrap();
    assert_eq!(event.event_type, EVENT_TYPE_PATIENT_CREATED);
    assert_eq!(event.name, "Jane");
    assert_eq!(event.email, "jane@x.com");
    assert_eq!(event.patient_id, onboarded.record.id.to_string());
    assert_eq!(messages[0].key, event.patient_id);
}

#[tokio::test]
async fn test_provisioning_receives_record_fields_before_any_event() {
    let h = harness(Outcome::Account);
    let onboarded = h.coordinator.onboard(jane()).await.unwrap();

    let calls = h.provisioner.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].patient_id, onboarded.record.id);
    assert_eq!(calls[0].name, "Jane");
    assert_eq!(calls[0].email, "jane@x.com");
    assert_eq!(*h.provisioner.events_seen_at_call.lock(), vec![0]);
}

#[tokio::test]
async fn test_provisioning_failures_emit_no_event() {
    for outcome in [Outcome::Unreachable, Outcome::RemoteFailure, Outcome::Timeout] {
        let h = harness(outcome);

        let err = h.coordinator.onboard(jane()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::Provisioning { .. }), "got {err:?}");
        assert!(h.stream.is_empty());

        // The record stays: there is no compensation.
        assert_eq!(h.repository.len(), 1);
    }
}

#[tokio::test]
async fn test_timeout_is_reported_as_timeout() {
    let h = harness(Outcome::Timeout);

    let err = h.coordinator.onboard(jane()).await.unwrap_err();
    assert_eq!(err.provisioning_error().map(|e| e.kind()), Some("timeout"));
    assert_eq!(h.stream.len(), 0);
}

#[tokio::test]
async fn test_publish_failure_still_succeeds() {
    let repository = Arc::new(InMemoryPatientRepository::new());
    let provisioner = Arc::new(MockProvisioner::new(
        Outcome::Account,
        Arc::new(MemoryStream::new()),
    ));
    let publisher = Arc::new(EventPublisher::inline(
        Arc::new(BrokenStream),
        PATIENT_TOPIC,
        Duration::from_millis(500),
    ));
    let coordinator = OnboardingCoordinator::new(repository.clone(), provisioner, publisher);

    let onboarded = coordinator.onboard(jane()).await.unwrap();
    assert_eq!(onboarded.account.account_id, "ACC-1");
    assert_eq!(
        repository.get(onboarded.record.id).await.unwrap(),
        Some(onboarded.record)
    );
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_before_provisioning() {
    let h = harness(Outcome::Account);
    h.coordinator.onboard(jane()).await.unwrap();

    let err = h
        .coordinator
        .onboard(NewPatient::new("Jane Again", "Jane@X.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardingError::Conflict { .. }));
    assert_eq!(h.provisioner.call_count(), 1);
    assert_eq!(h.stream.len(), 1);
}

#[tokio::test]
async fn test_invalid_request_touches_nothing() {
    let h = harness(Outcome::Account);

    let err = h
        .coordinator
        .onboard(NewPatient::new("  ", "jane@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardingError::Validation { .. }));
    assert!(h.repository.is_empty());
    assert_eq!(h.provisioner.call_count(), 0);
    assert!(h.stream.is_empty());
}

#[tokio::test]
async fn test_background_dispatch_delivers_by_shutdown() {
    let stream = Arc::new(MemoryStream::new());
    let publisher = Arc::new(EventPublisher::background(
        stream.clone(),
        PATIENT_TOPIC,
        Duration::from_millis(500),
        8,
        Duration::from_secs(2),
    ));
    let coordinator = OnboardingCoordinator::new(
        Arc::new(InMemoryPatientRepository::new()),
        Arc::new(MockProvisioner::new(Outcome::Account, stream.clone())),
        publisher.clone(),
    );

    coordinator.onboard(jane()).await.unwrap();
    publisher.shutdown().await;

    assert_eq!(stream.messages_for(PATIENT_TOPIC).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_are_independent() {
    let h = harness(Outcome::Account);
    let coordinator = Arc::clone(&h.coordinator);

    let mut handles = Vec::new();
    for i in 0..20 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator
                .onboard(NewPatient::new(format!("Patient {i}"), format!("p{i}@x.com")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.repository.len(), 20);
    assert_eq!(h.stream.len(), 20);
    assert_eq!(coordinator.list().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_detached_attempt_survives_dropped_caller() {
    let h = harness(Outcome::SlowAccount);

    let caller = tokio::spawn(Arc::clone(&h.coordinator).onboard_detached(jane()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(h.repository.len(), 1);
    assert_eq!(h.provisioner.call_count(), 1);
    let messages = h.stream.messages_for(PATIENT_TOPIC);
    assert_eq!(messages.len(), 1);
    let event = PatientEvent::from_bytes(&messages[0].payload).unwrap();
    assert_eq!(event.email, "jane@x.com");
}

#[tokio::test]
async fn test_detached_attempt_returns_outcome() {
    let h = harness(Outcome::Timeout);

    let err = Arc::clone(&h.coordinator)
        .onboard_detached(jane())
        .await
        .unwrap_err();
    assert_eq!(err.provisioning_error().map(|e| e.kind()), Some("timeout"));
    assert!(h.stream.is_empty());
}
