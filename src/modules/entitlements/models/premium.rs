use chrono::{DateTime, Utc};
use serde::Serialize;

use super::plan::FREE_PLAN_ID;

/// Cached premium assignment for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumEntitlement {
    pub user_id: String,
    pub has_premium: bool,
    pub premium_type: String,
    /// `None` means non-expiring
    pub premium_expiry: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PremiumEntitlement {
    pub fn free(user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            has_premium: false,
            premium_type: FREE_PLAN_ID.to_string(),
            premium_expiry: None,
            updated_at: at,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.has_premium && self.premium_expiry.map_or(true, |expiry| expiry > now)
    }

    /// What the user is entitled to at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> PremiumStatus {
        if self.is_active(now) {
            PremiumStatus {
                has_premium: true,
                premium_type: self.premium_type.clone(),
                premium_expiry: self.premium_expiry,
            }
        } else {
            PremiumStatus::free()
        }
    }
}

/// Effective premium state returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatus {
    pub has_premium: bool,
    pub premium_type: String,
    pub premium_expiry: Option<DateTime<Utc>>,
}

impl PremiumStatus {
    pub fn free() -> Self {
        Self {
            has_premium: false,
            premium_type: FREE_PLAN_ID.to_string(),
            premium_expiry: None,
        }
    }
}
