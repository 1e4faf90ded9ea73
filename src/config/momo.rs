use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_CREATE_ENDPOINT: &str = "https://payment.momo.vn/v2/gateway/api/create";
const DEFAULT_QUERY_ENDPOINT: &str = "https://payment.momo.vn/v2/gateway/api/query";

/// Whether payment requests reach MoMo or a local stand-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Live,
    Sandbox,
}

impl std::str::FromStr for GatewayMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "live" => Ok(GatewayMode::Live),
            "sandbox" => Ok(GatewayMode::Sandbox),
            other => Err(AppError::Configuration(format!("Invalid MOMO_MODE '{}'", other))),
        }
    }
}

/// Redirect and IPN URLs, which differ per purchase kind
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackUrls {
    pub top_up_redirect_url: String,
    pub top_up_ipn_url: String,
    pub premium_redirect_url: String,
    pub premium_ipn_url: String,
}

/// MoMo credentials and endpoints
#[derive(Clone, Deserialize)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub query_endpoint: String,
    pub request_timeout_secs: u64,
    pub mode: GatewayMode,
    /// Skips webhook signature verification; never allowed in production
    pub bypass_signature: bool,
    pub callbacks: CallbackUrls,
    /// Base URL used by the sandbox gateway to build pay links
    pub frontend_url: String,
}

impl std::fmt::Debug for MomoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MomoConfig")
            .field("partner_code", &self.partner_code)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("query_endpoint", &self.query_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("mode", &self.mode)
            .field("bypass_signature", &self.bypass_signature)
            .field("callbacks", &self.callbacks)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

impl MomoConfig {
    pub fn from_env() -> Result<Self> {
        let mode: GatewayMode = env::var("MOMO_MODE")
            .unwrap_or_else(|_| "live".to_string())
            .parse()?;

        Ok(MomoConfig {
            partner_code: env::var("MOMO_PARTNER_CODE").unwrap_or_default(),
            access_key: env::var("MOMO_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("MOMO_SECRET_KEY").unwrap_or_default(),
            endpoint: env::var("MOMO_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_CREATE_ENDPOINT.to_string()),
            query_endpoint: env::var("MOMO_QUERY_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_QUERY_ENDPOINT.to_string()),
            request_timeout_secs: env::var("MOMO_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Configuration("Invalid MOMO_REQUEST_TIMEOUT_SECS".to_string())
                })?,
            mode,
            bypass_signature: parse_flag("MOMO_BYPASS_SIGNATURE")?,
            callbacks: CallbackUrls {
                top_up_redirect_url: env::var("MOMO_TOPUP_RETURN_URL").unwrap_or_default(),
                top_up_ipn_url: env::var("MOMO_TOPUP_IPN_URL").unwrap_or_default(),
                premium_redirect_url: env::var("MOMO_PREMIUM_RETURN_URL").unwrap_or_default(),
                premium_ipn_url: env::var("MOMO_PREMIUM_IPN_URL").unwrap_or_default(),
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self, production: bool) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "MOMO_REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if !production {
            return Ok(());
        }

        if self.bypass_signature {
            return Err(AppError::Configuration(
                "MOMO_BYPASS_SIGNATURE cannot be enabled in production".to_string(),
            ));
        }

        if self.mode == GatewayMode::Sandbox {
            return Err(AppError::Configuration(
                "MOMO_MODE=sandbox cannot be used in production".to_string(),
            ));
        }

        for (name, value) in [
            ("MOMO_PARTNER_CODE", &self.partner_code),
            ("MOMO_ACCESS_KEY", &self.access_key),
            ("MOMO_SECRET_KEY", &self.secret_key),
            ("MOMO_TOPUP_IPN_URL", &self.callbacks.top_up_ipn_url),
            ("MOMO_PREMIUM_IPN_URL", &self.callbacks.premium_ipn_url),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Configuration(format!("{} not set", name)));
            }
        }

        Ok(())
    }
}

/// Reads a boolean env flag; absent means false
pub(crate) fn parse_flag(name: &str) -> Result<bool> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(AppError::Configuration(format!("Invalid boolean for {}", name))),
        },
    }
}
