use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::AppError;
use crate::middleware::AuthenticatedUser;
use crate::modules::entitlements::services::PremiumService;
use crate::modules::transactions::controllers::payment_notification;
use crate::modules::transactions::services::{PaymentService, ReconciliationEngine};

#[derive(Debug, Deserialize)]
pub struct PurchasePremiumRequest {
    #[serde(alias = "planId", alias = "planType")]
    pub plan: String,
}

/// GET /api/premium/plans
pub async fn list_plans(premium: web::Data<Arc<PremiumService>>) -> HttpResponse {
    HttpResponse::Ok().json(premium.plans())
}

/// Start a MoMo premium purchase
/// POST /api/premium/purchase
pub async fn purchase(
    payments: web::Data<Arc<PaymentService>>,
    user: AuthenticatedUser,
    request: web::Json<PurchasePremiumRequest>,
) -> Result<HttpResponse, AppError> {
    let created = payments
        .purchase_premium(&user.user_id, request.plan.trim())
        .await?;

    Ok(HttpResponse::Ok().json(created))
}

/// GET /api/premium/current
pub async fn current(
    premium: web::Data<Arc<PremiumService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(premium.current(&user.user_id).await?))
}

/// GET /api/premium/status/{id}
pub async fn get_status(
    engine: web::Data<Arc<ReconciliationEngine>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let transaction = engine.check_status(&user.user_id, &path).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// Configure premium routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/premium")
            .route("/plans", web::get().to(list_plans))
            .route("/purchase", web::post().to(purchase))
            .route("/current", web::get().to(current))
            .route("/status/{id}", web::get().to(get_status))
            .route("/momo-callback", web::post().to(payment_notification)),
    );
}
