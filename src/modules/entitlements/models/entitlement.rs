use chrono::{DateTime, Utc};

use super::premium::PremiumEntitlement;

/// Side effect unlocked by a successful transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    /// Add `amount` to the user's wallet
    WalletCredit { user_id: String, amount: i64 },

    /// Overwrite the user's premium plan
    PremiumActivation {
        user_id: String,
        plan_id: String,
        expiry: Option<DateTime<Utc>>,
    },
}

impl Entitlement {
    /// Premium record written by a `PremiumActivation`
    pub fn premium_record(&self, at: DateTime<Utc>) -> Option<PremiumEntitlement> {
        match self {
            Entitlement::WalletCredit { .. } => None,
            Entitlement::PremiumActivation {
                user_id,
                plan_id,
                expiry,
            } => Some(PremiumEntitlement {
                user_id: user_id.clone(),
                has_premium: true,
                premium_type: plan_id.clone(),
                premium_expiry: *expiry,
                updated_at: at,
            }),
        }
    }
}
