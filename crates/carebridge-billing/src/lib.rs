//! # carebridge-billing
//!
//! Synchronous client for the remote billing service.
//!
//! Every onboarded patient needs a billing account. [`BillingClient`] creates
//! one over gRPC (`/billing.BillingService/CreateBillingAccount`) and blocks
//! the onboarding flow until the remote side answers, the channel fails, or
//! the request timeout expires.
//!
//! The channel is created once per process and shared: `tonic` channels are
//! cheap to clone and multiplex concurrent calls over one connection.

pub mod client;
pub mod config;
pub mod error;
pub mod proto;
pub mod provisioner;

pub use client::BillingClient;
pub use config::{BillingConfig, MAX_REQUEST_TIMEOUT};
pub use error::ProvisioningError;
pub use provisioner::{AccountProvisioner, ProvisioningRequest, ProvisioningResponse};
