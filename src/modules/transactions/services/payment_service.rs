use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{AppError, Result};
use crate::modules::entitlements::models::{PlanCatalog, FREE_PLAN_ID};
use crate::modules::entitlements::repositories::EntitlementRepository;
use crate::modules::gateways::services::{PaymentGateway, PaymentRequest, PurchaseChannel};
use crate::modules::transactions::models::{Transaction, TransactionKind};
use crate::modules::transactions::repositories::TransactionRepository;

/// Returned to the client after a payment request was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreated {
    pub pay_url: String,
    pub transaction_id: String,
}

/// Creates provider payment requests backed by a pending transaction
#[derive(Clone)]
pub struct PaymentService {
    transaction_repo: Arc<dyn TransactionRepository>,
    entitlement_repo: Arc<dyn EntitlementRepository>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: PlanCatalog,
}

impl PaymentService {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        entitlement_repo: Arc<dyn EntitlementRepository>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: PlanCatalog,
    ) -> Self {
        Self {
            transaction_repo,
            entitlement_repo,
            gateway,
            catalog,
        }
    }

    /// Start a wallet top-up of `amount` VND
    pub async fn create_top_up(&self, user_id: &str, amount: i64) -> Result<PaymentCreated> {
        self.create_payment(user_id, amount, TransactionKind::WalletTopUp)
            .await
    }

    /// Start a premium plan purchase
    ///
    /// # Errors
    /// * `Validation` - Unknown or free plan
    /// * `Conflict` - User already holds this plan and it has not expired
    pub async fn purchase_premium(&self, user_id: &str, plan_id: &str) -> Result<PaymentCreated> {
        let plan = self
            .catalog
            .find(plan_id)
            .ok_or_else(|| AppError::validation(format!("Unknown plan '{}'", plan_id)))?;

        if plan.id == FREE_PLAN_ID || !plan.is_purchasable() {
            return Err(AppError::validation("The free plan cannot be purchased"));
        }

        let current = self
            .entitlement_repo
            .find_premium(user_id)
            .await?
            .map(|premium| premium.status_at(Utc::now()));

        if let Some(status) = current {
            if status.has_premium && status.premium_type == plan.id {
                return Err(AppError::conflict(format!(
                    "Plan '{}' is already active",
                    plan.id
                )));
            }
        }

        self.create_payment(
            user_id,
            plan.price,
            TransactionKind::PremiumPurchase {
                plan_id: plan.id.to_string(),
            },
        )
        .await
    }

    /// Persist a pending transaction, then ask the provider for a pay URL
    ///
    /// When the provider call fails the transaction stays `pending`; the
    /// webhook or the sweeper resolves it later.
    ///
    /// # Returns
    /// * `Result<PaymentCreated>` - Provider pay URL and local transaction id
    pub async fn create_payment(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
    ) -> Result<PaymentCreated> {
        let transaction = Transaction::new_pending(user_id, amount, kind)?;
        let transaction = self.transaction_repo.create(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            user_id = %transaction.user_id,
            amount = transaction.amount,
            kind = transaction.kind.code(),
            "Transaction created"
        );

        let (channel, order_info, extra_data) = match &transaction.kind {
            TransactionKind::WalletTopUp => (
                PurchaseChannel::TopUp,
                format!("Nap tien {}d", transaction.amount),
                String::new(),
            ),
            TransactionKind::PremiumPurchase { plan_id } => (
                PurchaseChannel::Premium,
                format!("Thanh toan goi Premium {}", plan_id),
                serde_json::json!({ "plan": plan_id }).to_string(),
            ),
        };

        let request = PaymentRequest {
            order_id: transaction.order_id(),
            request_id: transaction.provider_request_id.clone(),
            amount: transaction.amount,
            order_info,
            channel,
            extra_data,
        };

        match self.gateway.create_payment(request).await {
            Ok(response) => Ok(PaymentCreated {
                pay_url: response.pay_url,
                transaction_id: transaction.id,
            }),
            Err(e) => {
                error!(
                    transaction_id = %transaction.id,
                    gateway = self.gateway.name(),
                    error = %e,
                    "Payment provider call failed, transaction left pending"
                );
                Err(match e {
                    AppError::Gateway(msg) => AppError::Gateway(msg),
                    other => AppError::provider_unavailable(other.to_string()),
                })
            }
        }
    }
}
