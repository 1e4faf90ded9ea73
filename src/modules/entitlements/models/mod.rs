pub mod entitlement;
pub mod plan;
pub mod premium;
pub mod wallet;

pub use entitlement::Entitlement;
pub use plan::{PlanCatalog, PremiumPlan, FREE_PLAN_ID};
pub use premium::{PremiumEntitlement, PremiumStatus};
pub use wallet::{AccountSummary, BalanceRebuild, BalanceView, TopUpTotals, Wallet};
