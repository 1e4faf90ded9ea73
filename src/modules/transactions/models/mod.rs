pub mod transaction;

pub use transaction::{
    StatusTransition, Transaction, TransactionKind, TransactionStatus, TransitionOutcome,
};
