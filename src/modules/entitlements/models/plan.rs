use serde::Serialize;

/// Premium plan offered to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumPlan {
    pub id: &'static str,
    pub name: &'static str,
    /// Price in VND
    pub price: i64,
    /// Validity in days; 0 means the plan never expires
    pub duration_days: i64,
    pub daily_image_limit: u32,
}

impl PremiumPlan {
    pub fn is_purchasable(&self) -> bool {
        self.price > 0
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        (self.duration_days > 0).then(|| chrono::Duration::days(self.duration_days))
    }
}

pub const FREE_PLAN_ID: &str = "free";

const PLANS: &[PremiumPlan] = &[
    PremiumPlan {
        id: FREE_PLAN_ID,
        name: "Free",
        price: 0,
        duration_days: 0,
        daily_image_limit: 15,
    },
    PremiumPlan {
        id: "pro",
        name: "Pro",
        price: 199_000,
        duration_days: 30,
        daily_image_limit: 100,
    },
    PremiumPlan {
        id: "max",
        name: "Max",
        price: 1_990_000,
        duration_days: 365,
        daily_image_limit: 500,
    },
];

/// Fixed plan catalogue
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanCatalog;

impl PlanCatalog {
    pub fn all(&self) -> &'static [PremiumPlan] {
        PLANS
    }

    pub fn find(&self, id: &str) -> Option<&'static PremiumPlan> {
        PLANS.iter().find(|plan| plan.id == id)
    }
}
