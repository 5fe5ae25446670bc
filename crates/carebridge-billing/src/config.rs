//! Billing service connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProvisioningError;

/// Upper bound for `request_timeout`. Configured values above it are rejected.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Address and time budgets for the billing channel.
///
/// ```toml
/// [billing]
/// host = "localhost"
/// port = 9001
/// connect_timeout = "3s"
/// request_timeout = "5s"
/// eager_connect = false
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BillingConfig {
    pub host: String,
    pub port: u16,

    /// Budget for establishing the TCP/HTTP2 connection.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Budget for one `CreateBillingAccount` call, connection included.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Connect at startup instead of on first use. Startup then fails if the
    /// billing service is down.
    pub eager_connect: bool,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9001,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
            eager_connect: false,
        }
    }
}

impl BillingConfig {
    /// `http://host:port`, the form `tonic` endpoints expect.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ProvisioningError> {
        if self.host.trim().is_empty() {
            return Err(ProvisioningError::configuration("billing.host must not be empty"));
        }
        if self.port == 0 {
            return Err(ProvisioningError::configuration("billing.port must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ProvisioningError::configuration(
                "billing.connect_timeout must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() || self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(ProvisioningError::configuration(format!(
                "billing.request_timeout must be in (0, {}s]",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }
}
