pub mod models;
pub mod services;

pub use models::PaymentNotification;
pub use services::{
    MomoClient, PaymentGateway, PaymentRequest, PaymentResponse, PaymentStatus, ProviderStatus,
    PurchaseChannel, SandboxGateway, SignatureVerifier, Verification,
};
