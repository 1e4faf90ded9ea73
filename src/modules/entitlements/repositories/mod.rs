pub mod entitlement_repository;

pub use entitlement_repository::{
    apply_entitlement, EntitlementRepository, MySqlEntitlementRepository,
};
