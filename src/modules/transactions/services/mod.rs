pub mod payment_service;
pub mod reconciliation_engine;
pub mod staleness_sweeper;
pub mod transaction_service;

pub use payment_service::{PaymentCreated, PaymentService};
pub use reconciliation_engine::{NotificationOutcome, ReconciliationEngine};
pub use staleness_sweeper::StalenessSweeper;
pub use transaction_service::TransactionService;
