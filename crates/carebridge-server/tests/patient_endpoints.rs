use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use carebridge_auth::{AuthState, JwtService, TokenClaims};
use carebridge_billing::{
    AccountProvisioner, BillingConfig, ProvisioningError, ProvisioningRequest,
    ProvisioningResponse,
};
use carebridge_events::{EventPublisher, MemoryStream};
use carebridge_onboarding::{InMemoryPatientRepository, OnboardingCoordinator};
use carebridge_server::{AppConfig, PatientService, PatientState, build_patient_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const ISSUER: &str = "carebridge-auth";

#[derive(Clone, Copy)]
enum Billing {
    Ok,
    Lagging,
    Down,
    Slow,
    Rejects,
}

struct StubProvisioner {
    mode: Billing,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

#[async_trait]
impl AccountProvisioner for StubProvisioner {
    async fn create_account(
        &self,
        _request: &ProvisioningRequest,
    ) -> Result<ProvisioningResponse, ProvisioningError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.mode {
            Billing::Lagging => {
                tokio::time::sleep(Duration::from_millis(400)).await;
                self.completed.fetch_add(1, Ordering::SeqCst);
                Ok(ProvisioningResponse {
                    account_id: format!("ACC-{n}"),
                    status: "ACTIVE".into(),
                })
            }
            Billing::Ok => Ok(ProvisioningResponse {
                account_id: format!("ACC-{n}"),
                status: "ACTIVE".into(),
            }),
            Billing::Down => Err(ProvisioningError::unreachable(
                "http://billing:9001",
                "connection refused",
            )),
            Billing::Slow => Err(ProvisioningError::timeout(Duration::from_secs(5))),
            Billing::Rejects => Err(ProvisioningError::remote_failure(
                "Internal",
                "ledger locked",
            )),
        }
    }
}

struct Harness {
    base: String,
    token: String,
    stream: Arc<MemoryStream>,
    billing: Arc<StubProvisioner>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    server: JoinHandle<()>,
}

impl Harness {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.server.await;
    }
}

fn bearer(jwt: &JwtService) -> String {
    let claims = TokenClaims::new(ISSUER, "user-1", "a@x.com", "USER", Duration::from_secs(600));
    jwt.encode(&claims).unwrap()
}

async fn start(mode: Billing) -> Harness {
    let jwt = Arc::new(JwtService::from_secret(SECRET.as_bytes(), ISSUER).unwrap());
    let token = bearer(&jwt);

    let stream = Arc::new(MemoryStream::new());
    let publisher = Arc::new(EventPublisher::inline(
        stream.clone(),
        "patient",
        Duration::from_millis(500),
    ));
    let billing = Arc::new(StubProvisioner {
        mode,
        calls: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });
    let coordinator = OnboardingCoordinator::new(
        Arc::new(InMemoryPatientRepository::new()),
        billing.clone(),
        publisher,
    );
    let app = build_patient_app(PatientState {
        coordinator: Arc::new(coordinator),
        auth: AuthState::new(jwt),
    });

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    Harness {
        base: format!("http://{}", addr),
        token,
        stream,
        billing,
        shutdown: tx,
        server,
    }
}

#[tokio::test]
async fn test_create_requires_bearer_token() {
    let h = start(Billing::Ok).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/patients", h.base))
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{}/patients", h.base))
        .bearer_auth("not-a-token")
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/patients", h.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    assert!(h.stream.is_empty());
    h.stop().await;
}

#[tokio::test]
async fn test_token_from_another_issuer_is_rejected() {
    let h = start(Billing::Ok).await;
    let other = JwtService::from_secret(SECRET.as_bytes(), "someone-else").unwrap();
    let claims = TokenClaims::new("someone-else", "u", "a@x.com", "USER", Duration::from_secs(60));
    let foreign = other.encode(&claims).unwrap();

    let resp = reqwest::Client::new()
        .get(format!("{}/patients", h.base))
        .bearer_auth(foreign)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    h.stop().await;
}

#[tokio::test]
async fn test_create_returns_201_with_billing_account() {
    let h = start(Billing::Ok).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Jane");
    assert_eq!(body["email"], "jane@x.com");
    assert_eq!(body["billing_account_id"], "ACC-1");
    assert!(body["id"].as_str().is_some());

    assert_eq!(h.stream.len(), 1);

    let resp = client
        .get(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["email"], "jane@x.com");

    h.stop().await;
}

#[tokio::test]
async fn test_billing_failures_map_to_gateway_statuses() {
    let cases = [
        (Billing::Down, 502, "billing_unreachable"),
        (Billing::Rejects, 502, "billing_failed"),
        (Billing::Slow, 504, "billing_timeout"),
    ];

    for (mode, status, code) in cases {
        let h = start(mode).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/patients", h.base))
            .bearer_auth(&h.token)
            .json(&json!({"name": "Jane", "email": "jane@x.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), status, "{code}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], code);
        assert!(h.stream.is_empty(), "no event after {code}");
        h.stop().await;
    }
}

#[tokio::test]
async fn test_client_disconnect_does_not_abandon_onboarding() {
    let h = start(Billing::Lagging).await;
    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let sent = impatient
        .post(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await;
    assert!(sent.is_err(), "client should give up before billing answers");

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.billing.completed.load(Ordering::SeqCst), 1);
    let events = h.stream.messages_for("patient");
    assert_eq!(events.len(), 1);

    let resp = reqwest::Client::new()
        .get(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .send()
        .await
        .unwrap();
    let list: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);

    h.stop().await;
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let h = start(Billing::Ok).await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), reqwest::StatusCode::CREATED);

    let second = client
        .post(format!("{}/patients", h.base))
        .bearer_auth(&h.token)
        .json(&json!({"name": "Janet", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    assert_eq!(h.stream.len(), 1);
    h.stop().await;
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let h = start(Billing::Ok).await;
    let client = reqwest::Client::new();

    for payload in [
        json!({"name": "   ", "email": "jane@x.com"}),
        json!({"name": "Jane", "email": "not-an-email"}),
    ] {
        let resp = client
            .post(format!("{}/patients", h.base))
            .bearer_auth(&h.token)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "{payload}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_request");
    }

    assert!(h.stream.is_empty());
    h.stop().await;
}

#[tokio::test]
async fn test_bootstrapped_service_reports_billing_outage() {
    // Nothing listens on this port; the lazy channel fails on first use.
    let port = {
        let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        spare.local_addr().unwrap().port()
    };
    let cfg = AppConfig {
        auth: carebridge_auth::AuthConfig {
            signing_secret: SECRET.into(),
            ..Default::default()
        },
        billing: BillingConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_millis(300),
            request_timeout: Duration::from_secs(2),
            eager_connect: false,
        },
        ..AppConfig::default()
    };
    let service = PatientService::bootstrap(&cfg).await.unwrap();
    let jwt = JwtService::from_secret(SECRET.as_bytes(), &cfg.auth.issuer).unwrap();
    let token = bearer(&jwt);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let app = service.router();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    let resp = reqwest::Client::new()
        .post(format!("http://{}/patients", addr))
        .bearer_auth(token)
        .json(&json!({"name": "Jane", "email": "jane@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    let body: Value = resp.json().await.unwrap();
    let code = body["error"].as_str().unwrap();
    assert!(code.starts_with("billing_"), "{code}");

    let _ = tx.send(());
    let _ = server.await;
    service.shutdown().await;
}
