// Provider notification handling
//
// Signature rejection, duplicate delivery, failure codes, amount mismatch
// and the poll policies, all against the in-memory store.

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::{test, App};
use helpers::*;
use payrecon::config::PollPolicy;
use payrecon::core::AppError;
use payrecon::entitlements::EntitlementRepository;
use payrecon::middleware::JwtAuth;
use payrecon::transactions::{
    NotificationOutcome, Transaction, TransactionKind, TransactionRepository, TransactionStatus,
};
use serde_json::Value;

async fn pending_top_up(ctx: &TestContext, user: &str, amount: i64) -> Transaction {
    let created = ctx
        .services
        .payments
        .create_top_up(user, amount)
        .await
        .unwrap();
    ctx.store
        .find_by_id(&created.transaction_id)
        .await
        .unwrap()
        .unwrap()
}

async fn balance(ctx: &TestContext, user: &str) -> i64 {
    ctx.store
        .find_wallet(user)
        .await
        .unwrap()
        .map(|wallet| wallet.balance)
        .unwrap_or(0)
}

#[actix_web::test]
async fn test_invalid_signature_is_rejected_and_state_untouched() {
    let ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .wrap(JwtAuth::new(JWT_SECRET))
            .configure(ctx.routes()),
    )
    .await;
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    let forged = NotificationBuilder::for_transaction(&tx)
        .signed_with("attacker-secret")
        .build();
    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .set_json(forged)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // Amount raised after signing
    let mut tampered = NotificationBuilder::for_transaction(&tx).build();
    tampered["amount"] = Value::from(5_000_000);
    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .set_json(tampered)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let stored = ctx.store.find_by_id(&tx.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(balance(&ctx, &user).await, 0);
}

#[actix_web::test]
async fn test_malformed_and_unknown_notifications() {
    let ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .wrap(JwtAuth::new(JWT_SECRET))
            .configure(ctx.routes()),
    )
    .await;

    // Not JSON at all
    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("resultCode=0")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // Unknown transaction, correctly signed
    let stranger = Transaction::new_pending("ghost", 10_000, TransactionKind::WalletTopUp).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .set_json(NotificationBuilder::for_transaction(&stranger).build())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // No signature
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 10_000).await;
    let mut unsigned = NotificationBuilder::for_transaction(&tx).build();
    unsigned.as_object_mut().unwrap().remove("signature");
    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .set_json(unsigned)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[tokio::test]
async fn test_duplicate_notification_credits_once() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;
    let body = NotificationBuilder::for_transaction(&tx).build();

    let first = ctx.services.engine.handle_notification(&body).await.unwrap();
    assert!(matches!(first, NotificationOutcome::Applied(_)));

    for _ in 0..3 {
        let again = ctx.services.engine.handle_notification(&body).await.unwrap();
        assert!(matches!(again, NotificationOutcome::Duplicate(_)));
        assert_eq!(again.transaction().status, TransactionStatus::Success);
    }

    assert_eq!(balance(&ctx, &user).await, 50_000);
}

#[tokio::test]
async fn test_failure_code_marks_failed_with_reason() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    let body = NotificationBuilder::for_transaction(&tx)
        .result_code(1006, "Transaction denied by user.")
        .build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();

    let settled = outcome.transaction();
    assert_eq!(settled.status, TransactionStatus::Failed);
    assert_eq!(
        settled.status_reason.as_deref(),
        Some("Transaction denied by user. (1006)")
    );
    assert_eq!(balance(&ctx, &user).await, 0);

    // A late success for a failed payment is acknowledged but changes nothing
    let late = NotificationBuilder::for_transaction(&tx).build();
    let outcome = ctx.services.engine.handle_notification(&late).await.unwrap();
    assert!(matches!(outcome, NotificationOutcome::Duplicate(_)));
    assert_eq!(outcome.transaction().status, TransactionStatus::Failed);
    assert_eq!(balance(&ctx, &user).await, 0);
}

#[tokio::test]
async fn test_amount_mismatch_fails_without_credit() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    let body = NotificationBuilder::for_transaction(&tx).amount(5_000).build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();

    assert_eq!(outcome.transaction().status, TransactionStatus::Failed);
    assert!(outcome
        .transaction()
        .status_reason
        .as_deref()
        .unwrap()
        .starts_with("Amount mismatch"));
    assert_eq!(balance(&ctx, &user).await, 0);
}

#[tokio::test]
async fn test_fallback_layouts_and_missing_access_key() {
    let ctx = TestContext::new();
    let user = random_user_id();

    for layout in ["ipn-v2-without-response-time", "ipn-documented-order", "ipn-minimal"] {
        let tx = pending_top_up(&ctx, &user, 10_000).await;
        let body = NotificationBuilder::for_transaction(&tx).layout(layout).build();
        let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();
        assert_eq!(
            outcome.transaction().status,
            TransactionStatus::Success,
            "layout {}",
            layout
        );
    }

    let tx = pending_top_up(&ctx, &user, 10_000).await;
    let body = NotificationBuilder::for_transaction(&tx)
        .without("accessKey")
        .build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();
    assert_eq!(outcome.transaction().status, TransactionStatus::Success);

    assert_eq!(balance(&ctx, &user).await, 40_000);
}

#[tokio::test]
async fn test_resolves_by_order_id_when_request_id_is_missing() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 15_000).await;

    let body = NotificationBuilder::for_transaction(&tx)
        .without("requestId")
        .build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();
    assert_eq!(outcome.transaction().id, tx.id);
    assert_eq!(outcome.transaction().status, TransactionStatus::Success);
}

#[tokio::test]
async fn test_report_only_poll_never_settles() {
    let ctx = TestContext::with_poll_policy(PollPolicy::ReportOnly);
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;
    ctx.gateway.set_query_result(0, Some("123"));

    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Pending);
    assert_eq!(ctx.gateway.query_count(), 0);
    assert_eq!(balance(&ctx, &user).await, 0);
}

#[tokio::test]
async fn test_query_provider_poll_settles_from_provider_answer() {
    let ctx = TestContext::with_poll_policy(PollPolicy::QueryProvider);
    let user = random_user_id();

    // Still in flight at the provider
    let tx = pending_top_up(&ctx, &user, 50_000).await;
    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Pending);

    // Completed at the provider
    ctx.gateway.set_query_result(0, Some("987654"));
    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Success);
    assert_eq!(polled.provider_transaction_id.as_deref(), Some("987654"));
    assert_eq!(balance(&ctx, &user).await, 50_000);

    // The webhook arriving afterwards is a duplicate
    let body = NotificationBuilder::for_transaction(&tx).build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();
    assert!(matches!(outcome, NotificationOutcome::Duplicate(_)));
    assert_eq!(balance(&ctx, &user).await, 50_000);

    // Rejected at the provider
    let tx = pending_top_up(&ctx, &user, 20_000).await;
    ctx.gateway.set_query_result(1006, None);
    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Failed);
    assert_eq!(balance(&ctx, &user).await, 50_000);
}

#[tokio::test]
async fn test_query_provider_system_errors_leave_payment_open() {
    let ctx = TestContext::with_poll_policy(PollPolicy::QueryProvider);
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    // Maintenance, auth failure, duplicate requestId, unknown error
    for code in [10, 13, 41, 99] {
        ctx.gateway.set_query_result(code, None);
        let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
        assert_eq!(polled.status, TransactionStatus::Pending, "code {}", code);
    }

    // The user did pay; the webhook still credits them
    let body = NotificationBuilder::for_transaction(&tx).build();
    let outcome = ctx.services.engine.handle_notification(&body).await.unwrap();
    assert!(matches!(outcome, NotificationOutcome::Applied(_)));
    assert_eq!(balance(&ctx, &user).await, 50_000);
}

#[tokio::test]
async fn test_query_provider_amount_mismatch_fails_without_credit() {
    let ctx = TestContext::with_poll_policy(PollPolicy::QueryProvider);
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    ctx.gateway.set_query_result(0, Some("987654"));
    ctx.gateway.set_query_amount(5_000);

    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Failed);
    assert!(polled
        .status_reason
        .as_deref()
        .unwrap()
        .starts_with("Amount mismatch"));
    assert_eq!(balance(&ctx, &user).await, 0);
}

#[tokio::test]
async fn test_trust_return_poll_settles_without_provider() {
    let ctx = TestContext::with_poll_policy(PollPolicy::TrustReturn);
    let user = random_user_id();
    let tx = pending_top_up(&ctx, &user, 50_000).await;

    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Success);

    let polled = ctx.services.engine.check_status(&user, &tx.id).await.unwrap();
    assert_eq!(polled.status, TransactionStatus::Success);
    assert_eq!(balance(&ctx, &user).await, 50_000);
}

#[tokio::test]
async fn test_poll_of_foreign_transaction_is_forbidden() {
    let ctx = TestContext::with_poll_policy(PollPolicy::TrustReturn);
    let owner = random_user_id();
    let tx = pending_top_up(&ctx, &owner, 50_000).await;

    let err = ctx
        .services
        .engine
        .check_status("someone-else", &tx.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let stored = ctx.store.find_by_id(&tx.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
}
