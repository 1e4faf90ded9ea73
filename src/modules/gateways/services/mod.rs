pub mod gateway_trait;
pub mod momo;
pub mod sandbox;
pub mod signature;

pub use gateway_trait::{
    PaymentGateway, PaymentRequest, PaymentResponse, PaymentStatus, ProviderStatus,
    PurchaseChannel,
};
pub use momo::MomoClient;
pub use sandbox::SandboxGateway;
pub use signature::{CanonicalLayout, SignatureVerifier, Verification};
