pub mod topup_controller;
pub mod webhook_controller;

pub use topup_controller::configure;
pub use webhook_controller::{payment_notification, NotificationAck};
