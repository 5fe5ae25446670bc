//! # carebridge-server
//!
//! HTTP boundary and process wiring for the two CareBridge services:
//!
//! - `auth-service` issues and validates bearer tokens
//! - `patient-service` onboards patients behind the bearer gate

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod routes;
pub mod server;

pub use bootstrap::{PatientService, auth_service};
pub use config::AppConfig;
pub use error::ApiError;
pub use routes::patients::PatientState;
pub use server::{build_auth_app, build_patient_app, shutdown_signal};
