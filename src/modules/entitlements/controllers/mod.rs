pub mod premium_controller;

pub use premium_controller::configure;
