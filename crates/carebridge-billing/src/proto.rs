//! Wire messages of `billing.BillingService`.
//!
//! ```proto
//! service BillingService {
//!   rpc CreateBillingAccount (BillingRequest) returns (BillingResponse);
//! }
//! message BillingRequest  { string patient_id = 1; string name = 2; string email = 3; }
//! message BillingResponse { string account_id = 1; string status = 2; }
//! ```

use prost::Message;

/// Fully-qualified gRPC service name.
pub const SERVICE_NAME: &str = "billing.BillingService";

/// HTTP/2 path of the unary account creation call.
pub const CREATE_BILLING_ACCOUNT_PATH: &str = "/billing.BillingService/CreateBillingAccount";

#[derive(Clone, PartialEq, Eq, Message)]
pub struct BillingRequest {
    #[prost(string, tag = "1")]
    pub patient_id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct BillingResponse {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub status: String,
}
