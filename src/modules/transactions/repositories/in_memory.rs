use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::transaction_repository::TransactionRepository;
use crate::core::{AppError, Result};
use crate::modules::entitlements::models::{
    Entitlement, PremiumEntitlement, TopUpTotals, Wallet,
};
use crate::modules::entitlements::repositories::EntitlementRepository;
use crate::modules::transactions::models::{
    StatusTransition, Transaction, TransactionKind, TransactionStatus, TransitionOutcome,
};

#[derive(Debug, Default)]
struct StoreState {
    transactions: HashMap<String, Transaction>,
    wallets: HashMap<String, Wallet>,
    premiums: HashMap<String, PremiumEntitlement>,
}

/// Process-local store for tests and single-instance development
///
/// One mutex covers transactions and entitlement caches, so the
/// compare-and-set and its entitlement are a single critical section.
/// Configuration validation keeps it out of production.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions
    pub async fn len(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insert a transaction as-is, bypassing creation rules
    ///
    /// Used to seed history, e.g. backdated pending rows.
    pub async fn insert_raw(&self, transaction: Transaction) {
        self.state
            .lock()
            .await
            .transactions
            .insert(transaction.id.clone(), transaction);
    }

    /// Overwrite a cached wallet balance, e.g. to seed drift
    pub async fn seed_wallet(&self, user_id: &str, balance: i64) {
        self.state.lock().await.wallets.insert(
            user_id.to_string(),
            Wallet {
                user_id: user_id.to_string(),
                balance,
                updated_at: Utc::now(),
            },
        );
    }
}

impl StoreState {
    fn apply(&mut self, entitlement: &Entitlement, at: chrono::DateTime<Utc>) -> Result<()> {
        match entitlement {
            Entitlement::WalletCredit { user_id, amount } => {
                let current = self.wallets.get(user_id).map(|w| w.balance).unwrap_or(0);
                let balance = current.checked_add(*amount).ok_or_else(|| {
                    AppError::internal(format!("Wallet balance overflow for user '{}'", user_id))
                })?;

                self.wallets.insert(
                    user_id.clone(),
                    Wallet {
                        user_id: user_id.clone(),
                        balance,
                        updated_at: at,
                    },
                );
            }
            Entitlement::PremiumActivation { user_id, .. } => {
                if let Some(premium) = entitlement.premium_record(at) {
                    self.premiums.insert(user_id.clone(), premium);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction> {
        let mut state = self.state.lock().await;

        let duplicate = state.transactions.contains_key(&transaction.id)
            || state
                .transactions
                .values()
                .any(|tx| tx.provider_request_id == transaction.provider_request_id);
        if duplicate {
            return Err(AppError::conflict(format!(
                "Transaction '{}' already exists",
                transaction.id
            )));
        }

        state
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(transaction.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>> {
        Ok(self.state.lock().await.transactions.get(id).cloned())
    }

    async fn find_by_provider_request_id(&self, request_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .state
            .lock()
            .await
            .transactions
            .values()
            .find(|tx| tx.provider_request_id == request_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let state = self.state.lock().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();

        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn latest_successful_premium(&self, user_id: &str) -> Result<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .filter(|tx| {
                tx.user_id == user_id
                    && tx.status == TransactionStatus::Success
                    && matches!(tx.kind, TransactionKind::PremiumPurchase { .. })
            })
            .max_by_key(|tx| tx.updated_at)
            .cloned())
    }

    async fn sum_successful_top_ups(&self, user_id: &str) -> Result<TopUpTotals> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .filter(|tx| {
                tx.user_id == user_id
                    && tx.status == TransactionStatus::Success
                    && tx.kind == TransactionKind::WalletTopUp
            })
            .fold(TopUpTotals::default(), |totals, tx| TopUpTotals {
                total_amount: totals.total_amount + tx.amount,
                count: totals.count + 1,
            }))
    }

    async fn transition_status(
        &self,
        id: &str,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let current = state
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Transaction '{}'", id)))?;

        if current.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal(current));
        }

        let mut updated = current;
        updated.apply_transition(&transition, now)?;

        // Entitlement first: if it fails the row stays pending
        if let Some(entitlement) = &transition.entitlement {
            state.apply(entitlement, now)?;
        }

        state.transactions.insert(id.to_string(), updated.clone());
        Ok(TransitionOutcome::Applied(updated))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryStore {
    async fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>> {
        Ok(self.state.lock().await.wallets.get(user_id).cloned())
    }

    async fn rebuild_balance(&self, user_id: &str) -> Result<Wallet> {
        let mut state = self.state.lock().await;

        let balance = state
            .transactions
            .values()
            .filter(|tx| {
                tx.user_id == user_id
                    && tx.status == TransactionStatus::Success
                    && tx.kind == TransactionKind::WalletTopUp
            })
            .map(|tx| tx.amount)
            .sum::<i64>();

        let wallet = Wallet {
            user_id: user_id.to_string(),
            balance,
            updated_at: Utc::now(),
        };
        state.wallets.insert(user_id.to_string(), wallet.clone());
        Ok(wallet)
    }

    async fn find_premium(&self, user_id: &str) -> Result<Option<PremiumEntitlement>> {
        Ok(self.state.lock().await.premiums.get(user_id).cloned())
    }

    async fn store_premium(&self, premium: &PremiumEntitlement) -> Result<()> {
        self.state
            .lock()
            .await
            .premiums
            .insert(premium.user_id.clone(), premium.clone());
        Ok(())
    }
}
