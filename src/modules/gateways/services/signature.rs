use crate::core::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Ordered field list whose `key=value&...` join is signed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalLayout {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// Outbound payment creation (`/v2/gateway/api/create`)
pub const CREATE_PAYMENT: CanonicalLayout = CanonicalLayout {
    name: "create",
    fields: &[
        "accessKey",
        "amount",
        "extraData",
        "ipnUrl",
        "orderId",
        "orderInfo",
        "partnerCode",
        "redirectUrl",
        "requestId",
        "requestType",
    ],
};

/// Outbound status query (`/v2/gateway/api/query`)
pub const QUERY_STATUS: CanonicalLayout = CanonicalLayout {
    name: "query",
    fields: &["accessKey", "orderId", "partnerCode", "requestId"],
};

/// IPN layouts in priority order; the first is the documented one
pub const NOTIFICATION_LAYOUTS: &[CanonicalLayout] = &[
    CanonicalLayout {
        name: "ipn-v2",
        fields: &[
            "accessKey",
            "amount",
            "extraData",
            "message",
            "orderId",
            "orderInfo",
            "orderType",
            "partnerCode",
            "payType",
            "requestId",
            "responseTime",
            "resultCode",
            "transId",
        ],
    },
    CanonicalLayout {
        name: "ipn-v2-without-response-time",
        fields: &[
            "accessKey",
            "amount",
            "extraData",
            "message",
            "orderId",
            "orderInfo",
            "orderType",
            "partnerCode",
            "payType",
            "requestId",
            "resultCode",
            "transId",
        ],
    },
    CanonicalLayout {
        name: "ipn-documented-order",
        fields: &[
            "partnerCode",
            "accessKey",
            "requestId",
            "amount",
            "orderId",
            "orderInfo",
            "orderType",
            "transId",
            "message",
            "responseTime",
            "resultCode",
            "payType",
            "extraData",
        ],
    },
    CanonicalLayout {
        name: "ipn-minimal",
        fields: &[
            "partnerCode",
            "accessKey",
            "requestId",
            "amount",
            "orderId",
            "orderInfo",
            "orderType",
            "transId",
            "message",
            "resultCode",
            "payType",
        ],
    },
];

impl CanonicalLayout {
    /// Join the layout fields as `key=value&...`; absent fields sign as empty
    pub fn canonical_string(&self, payload: &BTreeMap<String, String>) -> String {
        self.fields
            .iter()
            .map(|field| {
                let value = payload.get(*field).map(String::as_str).unwrap_or("");
                format!("{}={}", field, value)
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Lowercase hex HMAC-SHA256 of the canonical string
    pub fn sign(&self, payload: &BTreeMap<String, String>, secret: &str) -> Result<String> {
        sign_raw(&self.canonical_string(payload), secret)
    }

    /// Constant-time check of `expected_signature` against this layout
    pub fn verify(
        &self,
        payload: &BTreeMap<String, String>,
        secret: &str,
        expected_signature: &str,
    ) -> bool {
        let expected = match hex::decode(expected_signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(self.canonical_string(payload).as_bytes());

        mac.verify_slice(&expected).is_ok()
    }
}

pub fn sign_raw(message: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Result of checking an inbound notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Matched the named layout
    Verified { layout: &'static str },

    /// Verification disabled by configuration
    Bypassed,

    Rejected,
}

impl Verification {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verification::Rejected)
    }
}

/// Verifies provider notifications against the shared secret
///
/// Holds the secret and the bypass flag from `MomoConfig`; business code never
/// reads them from the environment.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    bypass: bool,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("bypass", &self.bypass)
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, bypass: bool) -> Self {
        Self {
            secret: secret.into(),
            bypass,
        }
    }

    pub fn from_config(config: &crate::config::MomoConfig) -> Self {
        Self::new(config.secret_key.clone(), config.bypass_signature)
    }

    pub fn sign(
        &self,
        layout: &CanonicalLayout,
        payload: &BTreeMap<String, String>,
    ) -> Result<String> {
        layout.sign(payload, &self.secret)
    }

    /// Check an inbound notification against each known layout in order
    ///
    /// # Arguments
    /// * `payload` - Notification fields, stringified
    /// * `expected_signature` - Hex signature sent by the provider
    ///
    /// # Returns
    /// * `Verification` - First matching layout, bypass, or rejection
    pub fn verify_notification(
        &self,
        payload: &BTreeMap<String, String>,
        expected_signature: &str,
    ) -> Verification {
        if self.bypass {
            warn!("Signature verification bypassed by configuration");
            return Verification::Bypassed;
        }

        for (index, layout) in NOTIFICATION_LAYOUTS.iter().enumerate() {
            if layout.verify(payload, &self.secret, expected_signature) {
                if index == 0 {
                    debug!(layout = layout.name, "Notification signature verified");
                } else {
                    warn!(
                        layout = layout.name,
                        "Notification matched a fallback layout, provider format may have drifted"
                    );
                }
                return Verification::Verified {
                    layout: layout.name,
                };
            }
        }

        Verification::Rejected
    }
}
