//! HTTP route handlers.
//!
//! - `health` - liveness endpoint shared by both services
//! - `patients` - bearer-gated patient onboarding and listing

pub mod health;
pub mod patients;
