// Lazy expiry of stuck pending transactions
//
// History reads expire pending rows older than the fail timeout (failed) or
// the cancel timeout (cancelled); everything else is left alone.

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::{test, App};
use chrono::{Duration, Utc};
use helpers::*;
use payrecon::middleware::JwtAuth;
use payrecon::transactions::{
    StatusTransition, Transaction, TransactionKind, TransactionRepository, TransactionStatus,
};
use serde_json::Value;

fn backdated(user: &str, amount: i64, age: Duration) -> Transaction {
    let mut tx = Transaction::new_pending(user, amount, TransactionKind::WalletTopUp).unwrap();
    tx.created_at = Utc::now() - age;
    tx.updated_at = tx.created_at;
    tx
}

#[tokio::test]
async fn test_history_expires_stale_pending() {
    let ctx = TestContext::new();
    let user = random_user_id();

    let fresh = backdated(&user, 10_000, Duration::minutes(2));
    let stale = backdated(&user, 20_000, Duration::minutes(11));
    let abandoned = backdated(&user, 30_000, Duration::hours(25));
    for tx in [&fresh, &stale, &abandoned] {
        ctx.store.insert_raw(tx.clone()).await;
    }

    let history = ctx.services.transactions.history(&user).await.unwrap();
    let status_of = |id: &str| {
        history
            .iter()
            .find(|tx| tx.id == id)
            .map(|tx| tx.status)
            .unwrap()
    };

    assert_eq!(status_of(&fresh.id), TransactionStatus::Pending);
    assert_eq!(status_of(&stale.id), TransactionStatus::Failed);
    assert_eq!(status_of(&abandoned.id), TransactionStatus::Cancelled);

    let stored = ctx.store.find_by_id(&stale.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Failed);
    assert!(stored.status_reason.unwrap().contains("10 minutes"));
}

#[tokio::test]
async fn test_terminal_rows_are_never_swept() {
    let ctx = TestContext::new();
    let user = random_user_id();

    let mut old_failure = backdated(&user, 40_000, Duration::hours(48));
    old_failure
        .apply_transition(
            &StatusTransition::failed(Some("1".to_string()), "Declined (1006)"),
            old_failure.created_at,
        )
        .unwrap();
    ctx.store.insert_raw(old_failure.clone()).await;

    let history = ctx.services.transactions.history(&user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], old_failure);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let ctx = TestContext::new();
    let user = random_user_id();

    let older = backdated(&user, 10_000, Duration::minutes(5));
    let newer = backdated(&user, 20_000, Duration::minutes(1));
    ctx.store.insert_raw(older.clone()).await;
    ctx.store.insert_raw(newer.clone()).await;

    let history = ctx.services.transactions.history(&user).await.unwrap();
    let ids: Vec<_> = history.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
}

#[actix_web::test]
async fn test_webhook_after_expiry_is_acknowledged_without_credit() {
    let ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .wrap(JwtAuth::new(JWT_SECRET))
            .configure(ctx.routes()),
    )
    .await;
    let user = random_user_id();

    let stale = backdated(&user, 20_000, Duration::minutes(11));
    ctx.store.insert_raw(stale.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/topup/history")
        .insert_header(bearer(&user))
        .to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(history[0]["status"], "failed");

    let req = test::TestRequest::post()
        .uri("/api/topup/callback")
        .set_json(NotificationBuilder::for_transaction(&stale).build())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/topup/balance")
        .insert_header(bearer(&user))
        .to_request();
    let balance: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(balance["balance"], 0);
}
