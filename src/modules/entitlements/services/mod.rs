pub mod entitlement_applier;
pub mod premium_service;
pub mod wallet_service;

pub use entitlement_applier::EntitlementApplier;
pub use premium_service::PremiumService;
pub use wallet_service::WalletService;
