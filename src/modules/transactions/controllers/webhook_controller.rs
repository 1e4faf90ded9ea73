use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::core::AppError;
use crate::modules::transactions::services::{NotificationOutcome, ReconciliationEngine};

/// Acknowledgement MoMo expects so it stops retrying
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAck {
    pub message: String,
    pub result_code: i32,
}

/// Provider IPN callback
/// POST /api/topup/callback, POST /api/premium/momo-callback
///
/// Applied, duplicate and failed-payment notifications are all acknowledged
/// with 200; only invalid signatures, malformed bodies and unknown
/// transactions are rejected.
pub async fn payment_notification(
    engine: web::Data<Arc<ReconciliationEngine>>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let outcome = engine.handle_notification(&body).await?;

    let message = match &outcome {
        NotificationOutcome::Applied(tx) => format!("Transaction {}", tx.status),
        NotificationOutcome::Duplicate(tx) => format!("Transaction already {}", tx.status),
    };

    Ok(HttpResponse::Ok().json(NotificationAck {
        message,
        result_code: 0,
    }))
}
