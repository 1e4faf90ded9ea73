use crate::core::Result;
use crate::modules::gateways::models::{RESULT_PAYMENT_FAILED, RESULT_PENDING, RESULT_SUCCESS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payment provider boundary used by the payment and reconciliation services
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment request and return the hosted payment URL
    async fn create_payment(&self, request: PaymentRequest) -> Result<PaymentResponse>;

    /// Ask the provider for the authoritative status of an order
    ///
    /// Each query carries its own fresh `requestId`; the payment's original
    /// one is never reused.
    async fn query_status(&self, order_id: &str) -> Result<ProviderStatus>;

    /// Get gateway name
    fn name(&self) -> &str;
}

/// Which callback pair a payment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseChannel {
    TopUp,
    Premium,
}

/// Payment request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// `orderId`: `topup-{id}` or `premium-{id}`
    pub order_id: String,

    /// `requestId`: fresh per attempt
    pub request_id: String,

    /// Amount in VND
    pub amount: i64,

    /// Shown to the payer
    pub order_info: String,

    pub channel: PurchaseChannel,

    /// Opaque data echoed back in the notification
    pub extra_data: String,
}

/// Payment response from gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Payment URL for customer
    pub pay_url: String,

    /// `requestId` the provider acknowledged
    pub request_id: String,
}

/// Provider-side status as reported by a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub result_code: i64,
    pub trans_id: Option<String>,
    pub message: String,

    /// Amount the provider recorded for the order, when reported
    pub amount: Option<i64>,
}

/// Coarse meaning of a provider `resultCode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,

    /// The reply concerns the query itself, not the payment
    Unknown,
}

impl ProviderStatus {
    pub fn payment_status(&self) -> PaymentStatus {
        if self.result_code == RESULT_SUCCESS {
            PaymentStatus::Completed
        } else if RESULT_PENDING.contains(&self.result_code) {
            PaymentStatus::Pending
        } else if RESULT_PAYMENT_FAILED.contains(&self.result_code) {
            PaymentStatus::Failed
        } else {
            PaymentStatus::Unknown
        }
    }
}
