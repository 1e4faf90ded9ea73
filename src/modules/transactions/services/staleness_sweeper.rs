use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ReconciliationConfig;
use crate::core::Result;
use crate::modules::transactions::models::{StatusTransition, Transaction, TransactionStatus};
use crate::modules::transactions::repositories::TransactionRepository;

/// Expires transactions stuck in `pending`
///
/// Runs inline on history reads, not as a background task. Every expiry goes
/// through the store's compare-and-set, so a webhook that lands first wins.
#[derive(Clone)]
pub struct StalenessSweeper {
    transaction_repo: Arc<dyn TransactionRepository>,
    fail_after: Duration,
    cancel_after: Duration,
}

impl StalenessSweeper {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        config: &ReconciliationConfig,
    ) -> Self {
        Self {
            transaction_repo,
            fail_after: config.fail_after(),
            cancel_after: config.cancel_after(),
        }
    }

    /// Expiry due for `transaction` at `now`, if any
    ///
    /// The long timeout is checked first so day-old rows end up `cancelled`.
    pub fn expiry_for(
        &self,
        transaction: &Transaction,
        now: DateTime<Utc>,
    ) -> Option<StatusTransition> {
        if transaction.status != TransactionStatus::Pending {
            return None;
        }

        let age = transaction.age(now);
        if age > self.cancel_after {
            Some(StatusTransition::cancelled(format!(
                "No payment confirmation after {} hours",
                self.cancel_after.num_hours()
            )))
        } else if age > self.fail_after {
            Some(StatusTransition::failed(
                None,
                format!(
                    "No payment confirmation after {} minutes",
                    self.fail_after.num_minutes()
                ),
            ))
        } else {
            None
        }
    }

    /// Expire the stale pending transactions in `transactions`
    ///
    /// # Returns
    /// * `Result<usize>` - Number of transactions this call moved out of `pending`
    pub async fn sweep(&self, transactions: &[Transaction], now: DateTime<Utc>) -> Result<usize> {
        let mut expired = 0;

        for transaction in transactions {
            let Some(transition) = self.expiry_for(transaction, now) else {
                continue;
            };
            let target = transition.to;

            let outcome = self
                .transaction_repo
                .transition_status(&transaction.id, transition)
                .await?;

            if outcome.was_applied() {
                expired += 1;
                info!(
                    transaction_id = %transaction.id,
                    user_id = %transaction.user_id,
                    status = %target,
                    age_minutes = transaction.age(now).num_minutes(),
                    "Expired stale pending transaction"
                );
            } else {
                warn!(
                    transaction_id = %transaction.id,
                    status = %outcome.transaction().status,
                    "Stale transaction settled concurrently, expiry skipped"
                );
            }
        }

        Ok(expired)
    }
}
