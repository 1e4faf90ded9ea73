pub mod notification;

pub use notification::{
    PaymentNotification, RESULT_PAYMENT_FAILED, RESULT_PENDING, RESULT_SUCCESS,
};
