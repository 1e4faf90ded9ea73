pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::configure;
pub use models::{Entitlement, PlanCatalog, PremiumPlan, PremiumStatus};
pub use repositories::{EntitlementRepository, MySqlEntitlementRepository};
pub use services::{EntitlementApplier, PremiumService, WalletService};
