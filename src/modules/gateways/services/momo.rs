use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

use super::gateway_trait::{
    PaymentGateway, PaymentRequest, PaymentResponse, ProviderStatus, PurchaseChannel,
};
use super::signature::{SignatureVerifier, CREATE_PAYMENT, QUERY_STATUS};
use crate::config::MomoConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::models::RESULT_SUCCESS;

const REQUEST_TYPE: &str = "captureWallet";
const LANG: &str = "vi";

/// MoMo v2 gateway client
pub struct MomoClient {
    client: Client,
    config: MomoConfig,
    signer: SignatureVerifier,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody {
    partner_code: String,
    access_key: String,
    request_id: String,
    amount: i64,
    order_id: String,
    order_info: String,
    redirect_url: String,
    ipn_url: String,
    request_type: String,
    extra_data: String,
    lang: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentReply {
    result_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    pay_url: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody {
    partner_code: String,
    access_key: String,
    request_id: String,
    order_id: String,
    lang: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryReply {
    result_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    trans_id: Option<serde_json::Value>,
    #[serde(default)]
    amount: Option<i64>,
}

impl MomoClient {
    pub fn new(config: MomoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            signer: SignatureVerifier::from_config(&config),
            config,
        })
    }

    fn callback_urls(&self, channel: PurchaseChannel) -> (&str, &str) {
        let callbacks = &self.config.callbacks;
        match channel {
            PurchaseChannel::TopUp => (&callbacks.top_up_redirect_url, &callbacks.top_up_ipn_url),
            PurchaseChannel::Premium => {
                (&callbacks.premium_redirect_url, &callbacks.premium_ipn_url)
            }
        }
    }

    /// Signed status query body under a `requestId` of its own
    fn query_body(&self, order_id: &str, request_id: &str) -> Result<QueryBody> {
        let mut fields = BTreeMap::new();
        fields.insert("accessKey".to_string(), self.config.access_key.clone());
        fields.insert("orderId".to_string(), order_id.to_string());
        fields.insert("partnerCode".to_string(), self.config.partner_code.clone());
        fields.insert("requestId".to_string(), request_id.to_string());

        Ok(QueryBody {
            partner_code: self.config.partner_code.clone(),
            access_key: self.config.access_key.clone(),
            request_id: request_id.to_string(),
            order_id: order_id.to_string(),
            lang: LANG.to_string(),
            signature: self.signer.sign(&QUERY_STATUS, &fields)?,
        })
    }

    /// POST a JSON body and decode the reply, classifying transport failures
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::provider_unavailable(format!("MoMo request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::provider_unavailable(format!(
                "MoMo returned {}",
                status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| {
                AppError::provider_unavailable(format!("MoMo response read failed: {}", e))
            })?;

        if !status.is_success() {
            // MoMo reports business errors with a 4xx and a JSON body
            if let Ok(reply) = serde_json::from_str::<R>(&text) {
                return Ok(reply);
            }
            return Err(AppError::gateway(format!("MoMo returned {}: {}", status, text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| AppError::gateway(format!("Failed to parse MoMo response: {}", e)))
    }
}

/// MoMo rejects a `requestId` it has already seen, so every query gets one
fn status_query_request_id() -> String {
    format!("{}-q-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl PaymentGateway for MomoClient {
    async fn create_payment(&self, request: PaymentRequest) -> Result<PaymentResponse> {
        let (redirect_url, ipn_url) = self.callback_urls(request.channel);

        let mut fields = BTreeMap::new();
        fields.insert("accessKey".to_string(), self.config.access_key.clone());
        fields.insert("amount".to_string(), request.amount.to_string());
        fields.insert("extraData".to_string(), request.extra_data.clone());
        fields.insert("ipnUrl".to_string(), ipn_url.to_string());
        fields.insert("orderId".to_string(), request.order_id.clone());
        fields.insert("orderInfo".to_string(), request.order_info.clone());
        fields.insert("partnerCode".to_string(), self.config.partner_code.clone());
        fields.insert("redirectUrl".to_string(), redirect_url.to_string());
        fields.insert("requestId".to_string(), request.request_id.clone());
        fields.insert("requestType".to_string(), REQUEST_TYPE.to_string());

        let body = CreatePaymentBody {
            partner_code: self.config.partner_code.clone(),
            access_key: self.config.access_key.clone(),
            request_id: request.request_id.clone(),
            amount: request.amount,
            order_id: request.order_id.clone(),
            order_info: request.order_info,
            redirect_url: redirect_url.to_string(),
            ipn_url: ipn_url.to_string(),
            request_type: REQUEST_TYPE.to_string(),
            extra_data: request.extra_data,
            lang: LANG.to_string(),
            signature: self.signer.sign(&CREATE_PAYMENT, &fields)?,
        };

        let reply: CreatePaymentReply = self.post_json(&self.config.endpoint, &body).await?;

        if reply.result_code != RESULT_SUCCESS {
            error!(
                order_id = %request.order_id,
                result_code = reply.result_code,
                message = %reply.message,
                "MoMo rejected payment request"
            );
            return Err(AppError::gateway(format!(
                "MoMo rejected payment: {} ({})",
                reply.message, reply.result_code
            )));
        }

        let pay_url = reply
            .pay_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::gateway("MoMo response is missing payUrl"))?;

        info!(order_id = %request.order_id, "MoMo payment created");

        Ok(PaymentResponse {
            pay_url,
            request_id: reply.request_id.unwrap_or(request.request_id),
        })
    }

    async fn query_status(&self, order_id: &str) -> Result<ProviderStatus> {
        let request_id = status_query_request_id();
        let body = self.query_body(order_id, &request_id)?;

        let reply: QueryReply = self.post_json(&self.config.query_endpoint, &body).await?;

        let trans_id = match reply.trans_id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(ProviderStatus {
            result_code: reply.result_code,
            trans_id,
            message: reply.message,
            amount: reply.amount,
        })
    }

    fn name(&self) -> &str {
        "momo"
    }
}
