// Concurrent settlement
//
// Webhooks, retries and user polls race for the same pending transaction;
// exactly one of them may apply the entitlement.

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Utc;
use helpers::*;
use payrecon::config::PollPolicy;
use payrecon::entitlements::EntitlementRepository;
use payrecon::transactions::{
    NotificationOutcome, StalenessSweeper, TransactionRepository, TransactionStatus,
};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_duplicate_webhooks_credit_once() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let created = ctx
        .services
        .payments
        .create_top_up(&user, 50_000)
        .await
        .unwrap();
    let tx = ctx
        .store
        .find_by_id(&created.transaction_id)
        .await
        .unwrap()
        .unwrap();
    let body = Arc::new(NotificationBuilder::for_transaction(&tx).build());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = ctx.services.engine.clone();
            let body = body.clone();
            tokio::spawn(async move { engine.handle_notification(&body).await })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            NotificationOutcome::Applied(_) => applied += 1,
            NotificationOutcome::Duplicate(tx) => {
                assert_eq!(tx.status, TransactionStatus::Success)
            }
        }
    }

    assert_eq!(applied, 1);
    let wallet = ctx.store.find_wallet(&user).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 50_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_webhook_racing_poll_applies_once() {
    let ctx = TestContext::with_poll_policy(PollPolicy::TrustReturn);
    let user = random_user_id();

    for _ in 0..10 {
        let created = ctx
            .services
            .payments
            .create_top_up(&user, 10_000)
            .await
            .unwrap();
        let tx = ctx
            .store
            .find_by_id(&created.transaction_id)
            .await
            .unwrap()
            .unwrap();
        let body = NotificationBuilder::for_transaction(&tx).build();

        let webhook = {
            let engine = ctx.services.engine.clone();
            tokio::spawn(async move { engine.handle_notification(&body).await })
        };
        let poll = {
            let engine = ctx.services.engine.clone();
            let user = user.clone();
            let id = tx.id.clone();
            tokio::spawn(async move { engine.check_status(&user, &id).await })
        };

        let webhook = webhook.await.unwrap().unwrap();
        let polled = poll.await.unwrap().unwrap();
        assert_eq!(webhook.transaction().status, TransactionStatus::Success);
        assert_eq!(polled.status, TransactionStatus::Success);
    }

    let wallet = ctx.store.find_wallet(&user).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 100_000);
    assert_eq!(
        ctx.store.sum_successful_top_ups(&user).await.unwrap().total_amount,
        100_000
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweeper_racing_webhook_has_single_winner() {
    let ctx = TestContext::new();
    let user = random_user_id();
    let sweeper = StalenessSweeper::new(ctx.store.clone(), &ctx.config.reconciliation);

    let created = ctx
        .services
        .payments
        .create_top_up(&user, 70_000)
        .await
        .unwrap();
    let tx = ctx
        .store
        .find_by_id(&created.transaction_id)
        .await
        .unwrap()
        .unwrap();
    let body = NotificationBuilder::for_transaction(&tx).build();
    let later = Utc::now() + chrono::Duration::minutes(11);

    let webhook = {
        let engine = ctx.services.engine.clone();
        tokio::spawn(async move { engine.handle_notification(&body).await })
    };
    let sweep = {
        let rows = vec![tx.clone()];
        tokio::spawn(async move { sweeper.sweep(&rows, later).await })
    };

    let outcome = webhook.await.unwrap().unwrap();
    let expired = sweep.await.unwrap().unwrap();

    let stored = ctx.store.find_by_id(&tx.id).await.unwrap().unwrap();
    let balance = ctx
        .store
        .find_wallet(&user)
        .await
        .unwrap()
        .map(|wallet| wallet.balance)
        .unwrap_or(0);

    match outcome {
        NotificationOutcome::Applied(_) => {
            assert_eq!(expired, 0);
            assert_eq!(stored.status, TransactionStatus::Success);
            assert_eq!(balance, 70_000);
        }
        NotificationOutcome::Duplicate(_) => {
            assert_eq!(expired, 1);
            assert_eq!(stored.status, TransactionStatus::Failed);
            assert_eq!(balance, 0);
        }
    }
}
