use crate::core::{AppError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// MoMo `resultCode` for a completed payment
pub const RESULT_SUCCESS: i64 = 0;

/// `resultCode`s MoMo uses while a payment is still in flight
pub const RESULT_PENDING: &[i64] = &[1000, 7000, 7002, 9000];

/// `resultCode`s that describe the payment itself as declined or abandoned
///
/// Any other non-zero code from a status query (maintenance, auth, bad or
/// duplicate request) is about the query and says nothing of the payment.
pub const RESULT_PAYMENT_FAILED: &[i64] = &[
    1001, 1002, 1003, 1004, 1005, 1006, 1007, 1017, 1026, 4001, 4002, 4100,
];

/// Inbound IPN notification, kept as stringified fields
///
/// The signature covers the textual form of every field, so numbers are
/// stored exactly as the provider rendered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    fields: BTreeMap<String, String>,
    signature: String,
}

impl PaymentNotification {
    /// Parse a JSON notification body
    ///
    /// # Arguments
    /// * `body` - JSON object posted by the provider
    /// * `default_access_key` - Filled in when the provider omits `accessKey`
    pub fn from_json(body: &Value, default_access_key: &str) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| AppError::validation("Notification body must be a JSON object"))?;

        let mut fields = BTreeMap::new();
        let mut signature = None;

        for (key, value) in object {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => other.to_string(),
            };

            if key == "signature" {
                signature = Some(rendered);
            } else {
                fields.insert(key.clone(), rendered);
            }
        }

        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Notification is missing signature"))?;

        if !fields.contains_key("requestId") && !fields.contains_key("orderId") {
            return Err(AppError::validation(
                "Notification must carry requestId or orderId",
            ));
        }

        fields
            .entry("accessKey".to_string())
            .or_insert_with(|| default_access_key.to_string());

        Ok(Self { fields, signature })
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.field("requestId")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.field("orderId")
    }

    pub fn trans_id(&self) -> Option<&str> {
        self.field("transId")
    }

    pub fn message(&self) -> &str {
        self.field("message").unwrap_or("")
    }

    pub fn result_code(&self) -> Result<i64> {
        self.field("resultCode")
            .ok_or_else(|| AppError::validation("Notification is missing resultCode"))?
            .parse()
            .map_err(|_| AppError::validation("Notification resultCode is not numeric"))
    }

    pub fn amount(&self) -> Result<i64> {
        self.field("amount")
            .ok_or_else(|| AppError::validation("Notification is missing amount"))?
            .parse()
            .map_err(|_| AppError::invalid_amount("Notification amount is not numeric"))
    }
}
