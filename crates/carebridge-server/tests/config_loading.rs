use std::io::Write;
use std::time::Duration;

use carebridge_events::{DispatchMode, StreamBackend};
use carebridge_server::config::loader::load_config;

const SECRET_LINE: &str = r#"signing_secret = "0123456789abcdef0123456789abcdef""#;

fn write_toml(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn test_full_file_is_parsed() {
    let file = write_toml(&format!(
        r#"
[server]
host = "127.0.0.1"
auth_port = 5005
patient_port = 5000

[logging]
level = "debug"

[auth]
{SECRET_LINE}
token_lifetime = "2h"

[[auth.users]]
identifier = "admin@carebridge.test"
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo"
role = "ADMIN"

[billing]
host = "billing"
request_timeout = "750ms"

[events]
topic = "patient-events"
dispatch = "background"
queue_capacity = 64
memory_retention = 16
"#
    ));

    let cfg = load_config(file.path().to_str()).expect("config loads");
    assert_eq!(cfg.server.auth_port, 5005);
    assert_eq!(cfg.patient_addr().to_string(), "127.0.0.1:5000");
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.auth.token_lifetime, Duration::from_secs(2 * 3600));
    assert_eq!(cfg.auth.users.len(), 1);
    assert_eq!(cfg.auth.users[0].role, "ADMIN");
    assert_eq!(cfg.billing.host, "billing");
    assert_eq!(cfg.billing.request_timeout, Duration::from_millis(750));
    assert_eq!(cfg.events.backend, StreamBackend::Memory);
    assert_eq!(cfg.events.dispatch, DispatchMode::Background);
    assert_eq!(cfg.events.topic, "patient-events");
    assert_eq!(cfg.events.queue_capacity, 64);
    assert_eq!(cfg.events.memory_retention, 16);
}

#[test]
fn test_environment_overrides_file_values() {
    let file = write_toml(&format!(
        r#"
[auth]
{SECRET_LINE}

[billing]
eager_connect = false

[events]
publish_timeout = "200ms"
"#
    ));

    // SAFETY: no other test in this binary sets CAREBRIDGE variables.
    unsafe {
        std::env::set_var("CAREBRIDGE__BILLING__EAGER_CONNECT", "true");
    }
    let loaded = load_config(file.path().to_str());
    unsafe {
        std::env::remove_var("CAREBRIDGE__BILLING__EAGER_CONNECT");
    }

    let cfg = loaded.expect("config loads");
    assert!(cfg.billing.eager_connect);
    assert_eq!(cfg.events.publish_timeout, Duration::from_millis(200));
}

#[test]
fn test_missing_secret_fails_validation() {
    let file = write_toml("[server]\npatient_port = 4100\n");
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("auth config error"), "{err}");
}

#[test]
fn test_oversized_publish_timeout_is_rejected() {
    let file = write_toml(&format!(
        r#"
[auth]
{SECRET_LINE}

[events]
publish_timeout = "30s"
"#
    ));
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("events config error"), "{err}");
}

#[test]
fn test_malformed_duration_is_a_deserialize_error() {
    let file = write_toml(&format!(
        r#"
[auth]
{SECRET_LINE}

[billing]
request_timeout = "soon"
"#
    ));
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("deserialize"), "{err}");
}
