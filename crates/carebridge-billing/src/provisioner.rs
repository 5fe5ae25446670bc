//! The provisioning seam used by the onboarding coordinator.

use async_trait::async_trait;
use carebridge_core::{PatientId, PatientRecord};

use crate::error::ProvisioningError;
use crate::proto::{BillingRequest, BillingResponse};

/// Input of one provisioning call, copied from the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub patient_id: PatientId,
    pub name: String,
    pub email: String,
}

impl ProvisioningRequest {
    #[must_use]
    pub fn from_record(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
        }
    }
}

impl From<&ProvisioningRequest> for BillingRequest {
    fn from(request: &ProvisioningRequest) -> Self {
        Self {
            patient_id: request.patient_id.to_string(),
            name: request.name.clone(),
            email: request.email.clone(),
        }
    }
}

/// Remote answer: the created account and the status the service reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResponse {
    pub account_id: String,
    pub status: String,
}

impl From<BillingResponse> for ProvisioningResponse {
    fn from(response: BillingResponse) -> Self {
        Self {
            account_id: response.account_id,
            status: response.status,
        }
    }
}

/// Creates billing accounts for patients.
///
/// Implementations must be safe to call concurrently from many onboarding
/// tasks. At most one response is produced per call and nothing is retried.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    async fn create_account(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningResponse, ProvisioningError>;
}
