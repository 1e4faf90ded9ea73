use chrono::{DateTime, Utc};
use serde::Serialize;

use super::premium::PremiumStatus;

/// Cached wallet balance
///
/// Derived data: always re-derivable from successful wallet top-ups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            balance: 0,
            updated_at: at,
        }
    }
}

/// Sum over a user's successful top-ups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpTotals {
    pub total_amount: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Derived from successful top-ups
    pub balance: i64,
    pub cached_balance: i64,
    pub total_deposited: i64,
    pub successful_deposits: i64,
    pub premium: PremiumStatus,
}

/// Outcome of rebuilding the cached balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRebuild {
    pub old_balance: i64,
    pub new_balance: i64,
    pub total_topups: i64,
    pub difference: i64,
    pub premium: PremiumStatus,
}
