use async_trait::async_trait;
use tracing::info;

use super::gateway_trait::{PaymentGateway, PaymentRequest, PaymentResponse, ProviderStatus};
use crate::core::Result;
use crate::modules::transactions::models::Transaction;

/// `resultCode` MoMo uses for "transaction initiated, waiting for user"
const SANDBOX_PENDING_CODE: i64 = 1000;

/// Local stand-in for MoMo in development setups
///
/// Issues pay links into the frontend and never completes a payment on its
/// own; transactions settle through signed callbacks or the sweeper.
pub struct SandboxGateway {
    frontend_url: String,
}

impl SandboxGateway {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_payment(&self, request: PaymentRequest) -> Result<PaymentResponse> {
        let transaction_id = Transaction::id_from_order_id(&request.order_id)
            .unwrap_or(&request.order_id)
            .to_string();

        info!(order_id = %request.order_id, "Sandbox payment created");

        Ok(PaymentResponse {
            pay_url: format!("{}/topup-result?id={}", self.frontend_url, transaction_id),
            request_id: request.request_id,
        })
    }

    async fn query_status(&self, _order_id: &str) -> Result<ProviderStatus> {
        Ok(ProviderStatus {
            result_code: SANDBOX_PENDING_CODE,
            trans_id: None,
            message: "Sandbox transaction is waiting for confirmation".to_string(),
            amount: None,
        })
    }

    fn name(&self) -> &str {
        "sandbox"
    }
}
