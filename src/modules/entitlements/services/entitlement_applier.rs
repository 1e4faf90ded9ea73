use chrono::{DateTime, Utc};

use crate::core::{AppError, Result};
use crate::modules::entitlements::models::{Entitlement, PlanCatalog};
use crate::modules::transactions::models::{Transaction, TransactionKind};

/// Builds the side effect a successful transaction unlocks
///
/// The returned `Entitlement` is executed only by the transaction store, inside
/// the compare-and-set that moves the transaction out of `pending`. It never
/// checks idempotency itself and must not be applied anywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntitlementApplier {
    catalog: PlanCatalog,
}

impl EntitlementApplier {
    pub fn new(catalog: PlanCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Credit `amount` to the user's wallet, creating it at zero if absent
    pub fn top_up(&self, user_id: &str, amount: i64) -> Result<Entitlement> {
        if amount <= 0 {
            return Err(AppError::invalid_amount(format!(
                "Credit must be positive, got {}",
                amount
            )));
        }

        Ok(Entitlement::WalletCredit {
            user_id: user_id.to_string(),
            amount,
        })
    }

    /// Activate `plan_id` from `now`, overwriting any prior plan
    ///
    /// Plans are checked when the purchase is created, so an unknown one here
    /// is a data error.
    pub fn premium(&self, user_id: &str, plan_id: &str, now: DateTime<Utc>) -> Result<Entitlement> {
        let plan = self
            .catalog
            .find(plan_id)
            .ok_or_else(|| AppError::internal(format!("Unknown plan '{}'", plan_id)))?;

        Ok(Entitlement::PremiumActivation {
            user_id: user_id.to_string(),
            plan_id: plan.id.to_string(),
            expiry: plan.duration().map(|duration| now + duration),
        })
    }

    /// Entitlement for `transaction` succeeding at `now`
    pub fn for_transaction(
        &self,
        transaction: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Entitlement> {
        match &transaction.kind {
            TransactionKind::WalletTopUp => self.top_up(&transaction.user_id, transaction.amount),
            TransactionKind::PremiumPurchase { plan_id } => {
                self.premium(&transaction.user_id, plan_id, now)
            }
        }
    }
}
