use chrono::Utc;
use std::sync::Arc;

use super::staleness_sweeper::StalenessSweeper;
use crate::core::Result;
use crate::modules::transactions::models::Transaction;
use crate::modules::transactions::repositories::TransactionRepository;

/// Read side of a user's transactions
#[derive(Clone)]
pub struct TransactionService {
    transaction_repo: Arc<dyn TransactionRepository>,
    sweeper: StalenessSweeper,
}

impl TransactionService {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        sweeper: StalenessSweeper,
    ) -> Self {
        Self {
            transaction_repo,
            sweeper,
        }
    }

    /// A user's transactions, newest first, after expiring stale pending ones
    pub async fn history(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let transactions = self.transaction_repo.list_by_user(user_id).await?;

        let expired = self.sweeper.sweep(&transactions, Utc::now()).await?;
        if expired == 0 {
            return Ok(transactions);
        }

        self.transaction_repo.list_by_user(user_id).await
    }
}
