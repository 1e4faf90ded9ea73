pub mod entitlements;
pub mod gateways;
pub mod health;
pub mod transactions;
