use async_trait::async_trait;

use crate::core::Result;
use crate::modules::entitlements::models::TopUpTotals;
use crate::modules::transactions::models::{StatusTransition, Transaction, TransitionOutcome};

/// Persistence for payment transactions
///
/// Transactions are append-only: there is no delete, and the only mutation is
/// `transition_status`.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a new pending transaction
    async fn create(&self, transaction: &Transaction) -> Result<Transaction>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>>;

    async fn find_by_provider_request_id(&self, request_id: &str) -> Result<Option<Transaction>>;

    /// All transactions of a user, newest first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Transaction>>;

    /// Most recent successful premium purchase of a user
    async fn latest_successful_premium(&self, user_id: &str) -> Result<Option<Transaction>>;

    /// Sum and count of a user's successful wallet top-ups
    async fn sum_successful_top_ups(&self, user_id: &str) -> Result<TopUpTotals>;

    /// Atomic compare-and-set out of `pending`
    ///
    /// Moves the row to `transition.to` only if it is still `pending`, and in
    /// that case applies `transition.entitlement` in the same unit of work.
    /// A row that is already terminal is returned untouched as
    /// `TransitionOutcome::AlreadyTerminal` and no entitlement is applied.
    ///
    /// # Returns
    /// * `Result<TransitionOutcome>` - Applied or AlreadyTerminal, `NotFound` if the id is unknown
    async fn transition_status(
        &self,
        id: &str,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome>;

    /// Verify the store is reachable
    async fn health_check(&self) -> Result<()>;
}
