use chrono::Utc;
use std::sync::Arc;

use super::entitlement_applier::EntitlementApplier;
use crate::core::Result;
use crate::modules::entitlements::models::{PremiumPlan, PremiumStatus};
use crate::modules::entitlements::repositories::EntitlementRepository;

/// Premium plan catalogue and effective premium state
#[derive(Clone)]
pub struct PremiumService {
    entitlement_repo: Arc<dyn EntitlementRepository>,
    applier: EntitlementApplier,
}

impl PremiumService {
    pub fn new(
        entitlement_repo: Arc<dyn EntitlementRepository>,
        applier: EntitlementApplier,
    ) -> Self {
        Self {
            entitlement_repo,
            applier,
        }
    }

    pub fn applier(&self) -> &EntitlementApplier {
        &self.applier
    }

    pub fn plans(&self) -> &'static [PremiumPlan] {
        self.applier.catalog().all()
    }

    /// Effective premium state; expired plans report `free`
    pub async fn current(&self, user_id: &str) -> Result<PremiumStatus> {
        Ok(self
            .entitlement_repo
            .find_premium(user_id)
            .await?
            .map(|premium| premium.status_at(Utc::now()))
            .unwrap_or_else(PremiumStatus::free))
    }
}
