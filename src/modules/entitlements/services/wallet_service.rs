use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::premium_service::PremiumService;
use crate::core::Result;
use crate::modules::entitlements::models::{
    AccountSummary, BalanceRebuild, BalanceView, PremiumEntitlement,
};
use crate::modules::entitlements::repositories::EntitlementRepository;
use crate::modules::transactions::repositories::TransactionRepository;

/// Wallet balance queries and the cache rebuild
///
/// The authoritative balance is always the sum of successful wallet top-ups;
/// the cached wallet row only mirrors it.
#[derive(Clone)]
pub struct WalletService {
    transaction_repo: Arc<dyn TransactionRepository>,
    entitlement_repo: Arc<dyn EntitlementRepository>,
    premium: PremiumService,
}

impl WalletService {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        entitlement_repo: Arc<dyn EntitlementRepository>,
        premium: PremiumService,
    ) -> Self {
        Self {
            transaction_repo,
            entitlement_repo,
            premium,
        }
    }

    pub async fn balance(&self, user_id: &str) -> Result<BalanceView> {
        let totals = self.transaction_repo.sum_successful_top_ups(user_id).await?;
        Ok(BalanceView {
            balance: totals.total_amount,
        })
    }

    pub async fn account_summary(&self, user_id: &str) -> Result<AccountSummary> {
        let totals = self.transaction_repo.sum_successful_top_ups(user_id).await?;
        let cached_balance = self
            .entitlement_repo
            .find_wallet(user_id)
            .await?
            .map(|wallet| wallet.balance)
            .unwrap_or(0);

        if cached_balance != totals.total_amount {
            warn!(
                user_id,
                cached_balance,
                derived_balance = totals.total_amount,
                "Cached wallet balance drifted from transaction history"
            );
        }

        Ok(AccountSummary {
            balance: totals.total_amount,
            cached_balance,
            total_deposited: totals.total_amount,
            successful_deposits: totals.count,
            premium: self.premium.current(user_id).await?,
        })
    }

    /// Re-derive the cached balance and premium assignment from transactions
    pub async fn rebuild(&self, user_id: &str) -> Result<BalanceRebuild> {
        let totals = self.transaction_repo.sum_successful_top_ups(user_id).await?;
        let old_balance = self
            .entitlement_repo
            .find_wallet(user_id)
            .await?
            .map(|wallet| wallet.balance)
            .unwrap_or(0);

        let wallet = self.entitlement_repo.rebuild_balance(user_id).await?;

        let now = Utc::now();
        let premium = match self.transaction_repo.latest_successful_premium(user_id).await? {
            Some(purchase) => {
                // Activation time is when the purchase settled
                let entitlement = self
                    .premium
                    .applier()
                    .for_transaction(&purchase, purchase.updated_at)?;
                entitlement
                    .premium_record(now)
                    .unwrap_or_else(|| PremiumEntitlement::free(user_id, now))
            }
            None => PremiumEntitlement::free(user_id, now),
        };
        self.entitlement_repo.store_premium(&premium).await?;

        let rebuild = BalanceRebuild {
            old_balance,
            new_balance: wallet.balance,
            total_topups: totals.count,
            difference: wallet.balance - old_balance,
            premium: premium.status_at(now),
        };

        info!(
            user_id,
            old_balance = rebuild.old_balance,
            new_balance = rebuild.new_balance,
            difference = rebuild.difference,
            "Rebuilt cached wallet balance"
        );

        Ok(rebuild)
    }
}
