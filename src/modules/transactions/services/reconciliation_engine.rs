use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::PollPolicy;
use crate::core::{AppError, Result};
use crate::modules::entitlements::services::EntitlementApplier;
use crate::modules::gateways::models::{PaymentNotification, RESULT_SUCCESS};
use crate::modules::gateways::services::{
    PaymentGateway, PaymentStatus, SignatureVerifier, Verification,
};
use crate::modules::transactions::models::{
    StatusTransition, Transaction, TransactionStatus, TransitionOutcome,
};
use crate::modules::transactions::repositories::TransactionRepository;

/// What the webhook path did with a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// This notification settled the transaction
    Applied(Transaction),

    /// The transaction was already terminal; nothing changed
    Duplicate(Transaction),
}

impl NotificationOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            NotificationOutcome::Applied(tx) | NotificationOutcome::Duplicate(tx) => tx,
        }
    }
}

/// Turns provider signals into idempotent transaction settlements
///
/// Webhooks and user polls share one settlement routine. Correctness rests on
/// the store's compare-and-set, never on arrival order.
#[derive(Clone)]
pub struct ReconciliationEngine {
    transaction_repo: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: SignatureVerifier,
    applier: EntitlementApplier,
    poll_policy: PollPolicy,
    access_key: String,
}

impl ReconciliationEngine {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        applier: EntitlementApplier,
        poll_policy: PollPolicy,
        access_key: impl Into<String>,
    ) -> Self {
        Self {
            transaction_repo,
            gateway,
            verifier,
            applier,
            poll_policy,
            access_key: access_key.into(),
        }
    }

    /// Webhook path
    ///
    /// Safe to call any number of times with the same payload: repeats find the
    /// transaction terminal and return `Duplicate`.
    ///
    /// # Errors
    /// * `Validation` - Malformed payload
    /// * `NotFound` - No transaction for `requestId` / `orderId`
    /// * `InvalidSignature` - Signature did not verify; transaction untouched
    pub async fn handle_notification(&self, body: &Value) -> Result<NotificationOutcome> {
        let notification = PaymentNotification::from_json(body, &self.access_key)?;
        let transaction = self.resolve(&notification).await?;

        match self
            .verifier
            .verify_notification(notification.fields(), notification.signature())
        {
            Verification::Rejected => {
                warn!(
                    transaction_id = %transaction.id,
                    order_id = notification.order_id().unwrap_or(""),
                    "Rejected notification with invalid signature"
                );
                return Err(AppError::InvalidSignature);
            }
            Verification::Verified { layout } => {
                info!(transaction_id = %transaction.id, layout, "Notification signature verified");
            }
            Verification::Bypassed => {}
        }

        let result_code = notification.result_code()?;
        let trans_id = notification.trans_id().map(str::to_string);

        let transition = if result_code == RESULT_SUCCESS {
            self.paid_transition(&transaction, notification.amount()?, trans_id)?
        } else {
            StatusTransition::failed(
                trans_id,
                format!("{} ({})", notification.message(), result_code),
            )
        };

        let reported_success = result_code == RESULT_SUCCESS;
        let outcome = self.settle(&transaction, transition).await?;

        Ok(match outcome {
            TransitionOutcome::Applied(tx) => NotificationOutcome::Applied(tx),
            TransitionOutcome::AlreadyTerminal(tx) => {
                if reported_success && tx.status != TransactionStatus::Success {
                    error!(
                        transaction_id = %tx.id,
                        status = %tx.status,
                        "Provider reported success for a closed transaction, needs manual review"
                    );
                } else {
                    info!(
                        transaction_id = %tx.id,
                        status = %tx.status,
                        "Duplicate notification for settled transaction"
                    );
                }
                NotificationOutcome::Duplicate(tx)
            }
        })
    }

    /// Poll path: current status of a transaction owned by `user_id`
    pub async fn check_status(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        let transaction = self.owned_transaction(user_id, transaction_id).await?;

        if transaction.is_terminal() {
            return Ok(transaction);
        }

        match self.poll_policy {
            PollPolicy::ReportOnly => Ok(transaction),
            PollPolicy::QueryProvider => self.query_provider(transaction).await,
            PollPolicy::TrustReturn => {
                warn!(
                    transaction_id = %transaction.id,
                    "Marking pending transaction successful on user return"
                );
                let transition = self.success_transition(&transaction, None)?;
                Ok(self.settle(&transaction, transition).await?.into_transaction())
            }
        }
    }

    /// User cancellation of an own pending transaction
    ///
    /// # Errors
    /// * `NotFound`, `Forbidden` - Unknown id or not owned by `user_id`
    /// * `Conflict` - Transaction is no longer pending
    pub async fn cancel(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        let transaction = self.owned_transaction(user_id, transaction_id).await?;

        if transaction.is_terminal() {
            return Err(AppError::conflict(format!(
                "Transaction is already {}",
                transaction.status
            )));
        }

        match self
            .settle(&transaction, StatusTransition::cancelled("Cancelled by user"))
            .await?
        {
            TransitionOutcome::Applied(tx) => Ok(tx),
            TransitionOutcome::AlreadyTerminal(tx) => Err(AppError::conflict(format!(
                "Transaction is already {}",
                tx.status
            ))),
        }
    }

    async fn resolve(&self, notification: &PaymentNotification) -> Result<Transaction> {
        if let Some(request_id) = notification.request_id() {
            if let Some(tx) = self
                .transaction_repo
                .find_by_provider_request_id(request_id)
                .await?
            {
                return Ok(tx);
            }
        }

        if let Some(id) = notification.order_id().and_then(Transaction::id_from_order_id) {
            if let Some(tx) = self.transaction_repo.find_by_id(id).await? {
                return Ok(tx);
            }
        }

        warn!(
            request_id = notification.request_id().unwrap_or(""),
            order_id = notification.order_id().unwrap_or(""),
            "Notification for unknown transaction"
        );
        Err(AppError::not_found("Transaction not found"))
    }

    async fn owned_transaction(&self, user_id: &str, transaction_id: &str) -> Result<Transaction> {
        let transaction = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        if !transaction.is_owned_by(user_id) {
            warn!(
                transaction_id = %transaction.id,
                user_id,
                "User requested a transaction they do not own"
            );
            return Err(AppError::forbidden("Transaction belongs to another user"));
        }

        Ok(transaction)
    }

    async fn query_provider(&self, transaction: Transaction) -> Result<Transaction> {
        let status = match self.gateway.query_status(&transaction.order_id()).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    transaction_id = %transaction.id,
                    gateway = self.gateway.name(),
                    error = %e,
                    "Provider status query failed, reporting stored status"
                );
                return Ok(transaction);
            }
        };

        let transition = match status.payment_status() {
            PaymentStatus::Pending => return Ok(transaction),
            PaymentStatus::Unknown => {
                warn!(
                    transaction_id = %transaction.id,
                    result_code = status.result_code,
                    message = %status.message,
                    "Provider status query returned no payment outcome, reporting stored status"
                );
                return Ok(transaction);
            }
            PaymentStatus::Completed => match status.amount {
                Some(paid) => self.paid_transition(&transaction, paid, status.trans_id)?,
                None => {
                    warn!(
                        transaction_id = %transaction.id,
                        "Provider reported success without an amount, reporting stored status"
                    );
                    return Ok(transaction);
                }
            },
            PaymentStatus::Failed => StatusTransition::failed(
                status.trans_id,
                format!("{} ({})", status.message, status.result_code),
            ),
        };

        Ok(self.settle(&transaction, transition).await?.into_transaction())
    }

    /// Success reported for `paid`; anything but the exact amount fails the payment
    fn paid_transition(
        &self,
        transaction: &Transaction,
        paid: i64,
        trans_id: Option<String>,
    ) -> Result<StatusTransition> {
        if paid != transaction.amount {
            error!(
                transaction_id = %transaction.id,
                expected = transaction.amount,
                paid,
                "Provider amount does not match transaction"
            );
            return Ok(StatusTransition::failed(
                trans_id,
                format!("Amount mismatch: expected {}, got {}", transaction.amount, paid),
            ));
        }

        self.success_transition(transaction, trans_id)
    }

    fn success_transition(
        &self,
        transaction: &Transaction,
        trans_id: Option<String>,
    ) -> Result<StatusTransition> {
        let entitlement = self.applier.for_transaction(transaction, Utc::now())?;
        Ok(StatusTransition::success(trans_id, entitlement))
    }

    async fn settle(
        &self,
        transaction: &Transaction,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome> {
        let target = transition.to;
        let outcome = self
            .transaction_repo
            .transition_status(&transaction.id, transition)
            .await?;

        if let TransitionOutcome::Applied(tx) = &outcome {
            info!(
                transaction_id = %tx.id,
                user_id = %tx.user_id,
                amount = tx.amount,
                status = %target,
                "Transaction settled"
            );
        }

        Ok(outcome)
    }
}
