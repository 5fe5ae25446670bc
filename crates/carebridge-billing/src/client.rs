//! gRPC client for `billing.BillingService`.

use std::error::Error as _;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::config::BillingConfig;
use crate::error::ProvisioningError;
use crate::proto::{BillingRequest, BillingResponse, CREATE_BILLING_ACCOUNT_PATH};
use crate::provisioner::{AccountProvisioner, ProvisioningRequest, ProvisioningResponse};

/// Account provisioning client over one long-lived channel.
///
/// Cloning shares the underlying connection.
#[derive(Debug, Clone)]
pub struct BillingClient {
    channel: Channel,
    endpoint: String,
    request_timeout: Duration,
}

impl BillingClient {
    /// Creates the channel to the billing service.
    ///
    /// With `eager_connect` the connection is established here and an
    /// unreachable service fails startup. Otherwise it is opened on the first
    /// call and re-established by the channel after failures.
    pub async fn connect(config: &BillingConfig) -> Result<Self, ProvisioningError> {
        config.validate()?;

        let uri = config.uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| ProvisioningError::configuration(format!("invalid billing address {uri}: {e}")))?
            .connect_timeout(config.connect_timeout);

        let channel = if config.eager_connect {
            endpoint.connect().await.map_err(|e| {
                tracing::error!(host = %config.host, port = config.port, error = %e, "Billing service unreachable at startup");
                ProvisioningError::unreachable(&uri, e.to_string())
            })?
        } else {
            endpoint.connect_lazy()
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            eager = config.eager_connect,
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            "Billing channel created"
        );

        Ok(Self {
            channel,
            endpoint: uri,
            request_timeout: config.request_timeout,
        })
    }

    /// Target address of the channel.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningResponse, ProvisioningError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| ProvisioningError::unreachable(&self.endpoint, e.to_string()))?;

        let mut rpc_request = tonic::Request::new(BillingRequest::from(request));
        rpc_request.set_timeout(self.request_timeout);

        let codec = ProstCodec::<BillingRequest, BillingResponse>::default();
        let path = PathAndQuery::from_static(CREATE_BILLING_ACCOUNT_PATH);

        let response = grpc
            .unary(rpc_request, path, codec)
            .await
            .map_err(|status| self.classify(&status))?
            .into_inner();

        if response.account_id.is_empty() {
            return Err(ProvisioningError::remote_failure(
                "invalid_response",
                "billing service returned an empty account id",
            ));
        }

        Ok(response.into())
    }

    fn classify(&self, status: &Status) -> ProvisioningError {
        match status.code() {
            // The deadline travels in `grpc-timeout`; the server may report
            // its expiry as either code.
            Code::DeadlineExceeded | Code::Cancelled => {
                ProvisioningError::timeout(self.request_timeout)
            }
            Code::Unavailable => {
                ProvisioningError::unreachable(&self.endpoint, status.message())
            }
            _ if is_connection_error(status) => {
                ProvisioningError::unreachable(&self.endpoint, status.message())
            }
            code => ProvisioningError::remote_failure(format!("{code:?}"), status.message()),
        }
    }
}

/// Channel failures surface as a `Status` wrapping the transport error.
fn is_connection_error(status: &Status) -> bool {
    let mut source = status.source();
    while let Some(err) = source {
        if err.is::<tonic::transport::Error>() || err.is::<std::io::Error>() {
            return true;
        }
        source = err.source();
    }
    false
}

#[async_trait]
impl AccountProvisioner for BillingClient {
    async fn create_account(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningResponse, ProvisioningError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.request_timeout, self.call(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProvisioningError::timeout(self.request_timeout)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => tracing::info!(
                patient_id = %request.patient_id,
                account_id = %response.account_id,
                status = %response.status,
                elapsed_ms,
                "Billing account created"
            ),
            Err(e) => {
                metrics::counter!("carebridge_provisioning_failures_total", "kind" => e.kind())
                    .increment(1);
                tracing::warn!(
                    patient_id = %request.patient_id,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Billing account creation failed"
                );
            }
        }

        result
    }
}
