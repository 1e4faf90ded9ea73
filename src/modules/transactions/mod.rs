pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::configure;
pub use models::{
    StatusTransition, Transaction, TransactionKind, TransactionStatus, TransitionOutcome,
};
pub use repositories::{InMemoryStore, MySqlTransactionRepository, TransactionRepository};
pub use services::{
    NotificationOutcome, PaymentCreated, PaymentService, ReconciliationEngine, StalenessSweeper,
    TransactionService,
};
