use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::webhook_controller::payment_notification;
use crate::core::AppError;
use crate::middleware::AuthenticatedUser;
use crate::modules::entitlements::services::WalletService;
use crate::modules::transactions::services::{
    PaymentService, ReconciliationEngine, TransactionService,
};

#[derive(Debug, Deserialize)]
pub struct CreateTopUpRequest {
    pub amount: i64,
}

/// Start a MoMo wallet top-up
/// POST /api/topup/create-momo
pub async fn create_momo_payment(
    payments: web::Data<Arc<PaymentService>>,
    user: AuthenticatedUser,
    request: web::Json<CreateTopUpRequest>,
) -> Result<HttpResponse, AppError> {
    let created = payments
        .create_top_up(&user.user_id, request.amount)
        .await?;

    Ok(HttpResponse::Ok().json(created))
}

/// GET /api/topup/status/{id}
pub async fn get_status(
    engine: web::Data<Arc<ReconciliationEngine>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let transaction = engine.check_status(&user.user_id, &path).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// GET /api/topup/history
pub async fn get_history(
    transactions: web::Data<Arc<TransactionService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let history = transactions.history(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// PUT /api/topup/cancel/{id}
pub async fn cancel(
    engine: web::Data<Arc<ReconciliationEngine>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let transaction = engine.cancel(&user.user_id, &path).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// GET /api/topup/balance
pub async fn get_balance(
    wallets: web::Data<Arc<WalletService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(wallets.balance(&user.user_id).await?))
}

/// GET /api/topup/account-summary
pub async fn get_account_summary(
    wallets: web::Data<Arc<WalletService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(wallets.account_summary(&user.user_id).await?))
}

/// Rebuild cached balance and premium from transaction history
/// POST /api/topup/fix-balance
pub async fn fix_balance(
    wallets: web::Data<Arc<WalletService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(wallets.rebuild(&user.user_id).await?))
}

/// Configure top-up routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/topup")
            .route("/create-momo", web::post().to(create_momo_payment))
            .route("/callback", web::post().to(payment_notification))
            .route("/status/{id}", web::get().to(get_status))
            .route("/history", web::get().to(get_history))
            .route("/cancel/{id}", web::put().to(cancel))
            .route("/balance", web::get().to(get_balance))
            .route("/account-summary", web::get().to(get_account_summary))
            .route("/fix-balance", web::post().to(fix_balance)),
    );
}
