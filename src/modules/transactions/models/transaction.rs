use crate::core::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction lifecycle status
///
/// `pending` is the only non-terminal state. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Waiting for provider confirmation
    Pending,

    /// Payment confirmed and entitlement applied
    Success,

    /// Payment rejected by the provider or timed out
    Failed,

    /// Abandoned by the user or expired long ago
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// The only legal moves are `pending -> {success, failed, cancelled}`
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == TransactionStatus::Pending && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

/// What a successful transaction unlocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    WalletTopUp,
    PremiumPurchase {
        #[serde(rename = "planId")]
        plan_id: String,
    },
}

impl TransactionKind {
    pub const WALLET_TOP_UP: &'static str = "wallet_top_up";
    pub const PREMIUM_PURCHASE: &'static str = "premium_purchase";

    /// Storage discriminator
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::WalletTopUp => Self::WALLET_TOP_UP,
            TransactionKind::PremiumPurchase { .. } => Self::PREMIUM_PURCHASE,
        }
    }

    pub fn plan_id(&self) -> Option<&str> {
        match self {
            TransactionKind::WalletTopUp => None,
            TransactionKind::PremiumPurchase { plan_id } => Some(plan_id),
        }
    }

    /// Rebuild from the storage discriminator and optional plan column
    pub fn from_parts(code: &str, plan_id: Option<String>) -> Result<Self> {
        match (code, plan_id) {
            (Self::WALLET_TOP_UP, _) => Ok(TransactionKind::WalletTopUp),
            (Self::PREMIUM_PURCHASE, Some(plan_id)) => {
                Ok(TransactionKind::PremiumPurchase { plan_id })
            }
            (Self::PREMIUM_PURCHASE, None) => Err(AppError::internal(
                "Premium purchase stored without plan id",
            )),
            (other, _) => Err(AppError::internal(format!(
                "Invalid transaction kind: {}",
                other
            ))),
        }
    }

    fn order_prefix(&self) -> &'static str {
        match self {
            TransactionKind::WalletTopUp => "topup",
            TransactionKind::PremiumPurchase { .. } => "premium",
        }
    }
}

/// One payment attempt and its lifecycle
///
/// Created `pending` by the payment service, mutated only through the
/// repository compare-and-set, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique transaction ID (UUID)
    pub id: String,

    /// Owning user, immutable
    pub user_id: String,

    /// Amount in VND, immutable and positive
    pub amount: i64,

    pub kind: TransactionKind,

    pub status: TransactionStatus,

    /// `requestId` sent to the provider; unique per attempt
    pub provider_request_id: String,

    /// `transId` assigned by the provider on completion
    pub provider_transaction_id: Option<String>,

    /// Diagnostic only
    pub status_reason: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction
    ///
    /// # Arguments
    /// * `user_id` - Owning user
    /// * `amount` - Amount in VND, must be positive
    /// * `kind` - Wallet top-up or premium purchase
    ///
    /// # Returns
    /// * `Result<Transaction>` - Pending transaction with a fresh provider request id
    pub fn new_pending(user_id: &str, amount: i64, kind: TransactionKind) -> Result<Self> {
        if user_id.trim().is_empty() {
            return Err(AppError::unauthorized("User is not authenticated"));
        }

        if amount <= 0 {
            return Err(AppError::invalid_amount(format!(
                "Amount must be greater than 0, got {}",
                amount
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        Ok(Self {
            provider_request_id: format!("{}-{}", now.timestamp_millis(), id),
            id,
            user_id: user_id.to_string(),
            amount,
            kind,
            status: TransactionStatus::Pending,
            provider_transaction_id: None,
            status_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// `orderId` sent to the provider: `topup-{id}` or `premium-{id}`
    pub fn order_id(&self) -> String {
        format!("{}-{}", self.kind.order_prefix(), self.id)
    }

    /// Extract the transaction id from a provider `orderId`
    pub fn id_from_order_id(order_id: &str) -> Option<&str> {
        ["topup-", "premium-"]
            .iter()
            .find_map(|prefix| order_id.strip_prefix(prefix))
            .filter(|id| !id.is_empty())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Apply a terminal status in memory
    ///
    /// Persistence goes through `TransactionRepository::transition_status`;
    /// this mirrors the same rule for in-memory copies.
    pub fn apply_transition(
        &mut self,
        transition: &StatusTransition,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(transition.to) {
            return Err(AppError::conflict(format!(
                "Transaction '{}' cannot move from {} to {}",
                self.id, self.status, transition.to
            )));
        }

        self.status = transition.to;
        if transition.provider_transaction_id.is_some() {
            self.provider_transaction_id = transition.provider_transaction_id.clone();
        }
        self.status_reason = transition.reason.clone();
        self.updated_at = at;
        Ok(())
    }
}

/// Width of the `status_reason` column
pub const STATUS_REASON_MAX_CHARS: usize = 255;

fn bounded_reason(reason: impl Into<String>) -> String {
    let reason = reason.into();
    match reason.char_indices().nth(STATUS_REASON_MAX_CHARS) {
        Some((cut, _)) => reason[..cut].to_string(),
        None => reason,
    }
}

/// Requested move out of `pending`, plus the entitlement to apply with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub to: TransactionStatus,
    pub provider_transaction_id: Option<String>,
    pub reason: Option<String>,
    pub entitlement: Option<crate::modules::entitlements::Entitlement>,
}

impl StatusTransition {
    pub fn success(
        provider_transaction_id: Option<String>,
        entitlement: crate::modules::entitlements::Entitlement,
    ) -> Self {
        Self {
            to: TransactionStatus::Success,
            provider_transaction_id,
            reason: None,
            entitlement: Some(entitlement),
        }
    }

    pub fn failed(provider_transaction_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            to: TransactionStatus::Failed,
            provider_transaction_id,
            reason: Some(bounded_reason(reason)),
            entitlement: None,
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            to: TransactionStatus::Cancelled,
            provider_transaction_id: None,
            reason: Some(bounded_reason(reason)),
            entitlement: None,
        }
    }
}

/// Result of the compare-and-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This caller moved the row out of `pending`; the entitlement was applied
    Applied(Transaction),

    /// The row was already terminal; nothing was written
    AlreadyTerminal(Transaction),
}

impl TransitionOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            TransitionOutcome::Applied(tx) | TransitionOutcome::AlreadyTerminal(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            TransitionOutcome::Applied(tx) | TransitionOutcome::AlreadyTerminal(tx) => tx,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}
