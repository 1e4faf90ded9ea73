//! payrecon: MoMo payment creation and reconciliation service
//!
//! Wallet top-ups and premium purchases are created against the MoMo gateway
//! and settled exactly once, whether the provider webhook or a user poll
//! arrives first.

pub mod app;
pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use app::{build_gateway, AppServices, Storage};
pub use modules::entitlements;
pub use modules::gateways;
pub use modules::transactions;
