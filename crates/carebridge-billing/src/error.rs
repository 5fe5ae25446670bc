//! Provisioning error types.

use std::time::Duration;

/// Errors from a billing account provisioning attempt.
///
/// All of them abort the onboarding attempt that triggered the call.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    /// The billing service could not be reached.
    #[error("Billing service unreachable at {endpoint}: {message}")]
    Unreachable {
        /// The `http://host:port` the channel targets.
        endpoint: String,
        message: String,
    },

    /// The billing service answered with an error.
    #[error("Billing service failed ({code}): {message}")]
    RemoteFailure {
        /// gRPC status code name, or `invalid_response`.
        code: String,
        message: String,
    },

    /// No answer within the request budget.
    #[error("Billing call timed out after {after:?}")]
    Timeout { after: Duration },

    /// The client configuration is unusable.
    #[error("Billing configuration error: {message}")]
    Configuration { message: String },
}

impl ProvisioningError {
    #[must_use]
    pub fn unreachable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn remote_failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Short label used for the `kind` metric label and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::RemoteFailure { .. } => "remote_failure",
            Self::Timeout { .. } => "timeout",
            Self::Configuration { .. } => "configuration",
        }
    }

    /// Returns `true` if a later attempt could succeed without changes.
    ///
    /// Nothing retries automatically; this only informs callers and logs.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}
