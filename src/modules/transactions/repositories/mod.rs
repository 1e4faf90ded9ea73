pub mod in_memory;
pub mod mysql_repository;
pub mod transaction_repository;

pub use in_memory::InMemoryStore;
pub use mysql_repository::MySqlTransactionRepository;
pub use transaction_repository::TransactionRepository;
