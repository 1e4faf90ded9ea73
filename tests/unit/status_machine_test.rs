// Transaction status machine
//
// pending is the only state that may change, and only into a terminal state.

use chrono::Utc;
use payrecon::core::AppError;
use payrecon::transactions::{StatusTransition, Transaction, TransactionKind, TransactionStatus};

const ALL: [TransactionStatus; 4] = [
    TransactionStatus::Pending,
    TransactionStatus::Success,
    TransactionStatus::Failed,
    TransactionStatus::Cancelled,
];

#[test]
fn test_only_pending_moves_and_only_to_terminal() {
    for from in ALL {
        for to in ALL {
            let allowed = from == TransactionStatus::Pending && to != TransactionStatus::Pending;
            assert_eq!(
                from.can_transition_to(to),
                allowed,
                "{} -> {}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_status_text_roundtrip() {
    for status in ALL {
        assert_eq!(status.as_str().parse::<TransactionStatus>().unwrap(), status);
    }
    assert!("completed".parse::<TransactionStatus>().is_err());
}

#[test]
fn test_terminal_transaction_is_frozen() {
    let mut tx = Transaction::new_pending("u1", 50_000, TransactionKind::WalletTopUp).unwrap();
    tx.apply_transition(&StatusTransition::failed(Some("1".into()), "Timeout (1005)"), Utc::now())
        .unwrap();

    let snapshot = tx.clone();
    for transition in [
        StatusTransition::cancelled("late cancel"),
        StatusTransition::failed(None, "again"),
    ] {
        let err = tx.apply_transition(&transition, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
    assert_eq!(tx, snapshot);
}

#[test]
fn test_transition_keeps_amount_and_owner() {
    let mut tx = Transaction::new_pending(
        "u1",
        199_000,
        TransactionKind::PremiumPurchase {
            plan_id: "pro".to_string(),
        },
    )
    .unwrap();
    let later = tx.created_at + chrono::Duration::minutes(2);

    tx.apply_transition(&StatusTransition::cancelled("Cancelled by user"), later)
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Cancelled);
    assert_eq!(tx.amount, 199_000);
    assert_eq!(tx.user_id, "u1");
    assert_eq!(tx.updated_at, later);
    assert_eq!(tx.status_reason.as_deref(), Some("Cancelled by user"));
}

#[test]
fn test_new_pending_rejects_bad_input() {
    assert!(matches!(
        Transaction::new_pending("u1", 0, TransactionKind::WalletTopUp),
        Err(AppError::InvalidAmount(_))
    ));
    assert!(matches!(
        Transaction::new_pending("u1", -5, TransactionKind::WalletTopUp),
        Err(AppError::InvalidAmount(_))
    ));
    assert!(matches!(
        Transaction::new_pending("", 10_000, TransactionKind::WalletTopUp),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn test_order_ids_resolve_back_to_transaction() {
    let top_up = Transaction::new_pending("u1", 10_000, TransactionKind::WalletTopUp).unwrap();
    assert_eq!(top_up.order_id(), format!("topup-{}", top_up.id));
    assert_eq!(
        Transaction::id_from_order_id(&top_up.order_id()),
        Some(top_up.id.as_str())
    );

    let premium = Transaction::new_pending(
        "u1",
        199_000,
        TransactionKind::PremiumPurchase {
            plan_id: "pro".to_string(),
        },
    )
    .unwrap();
    assert_eq!(premium.order_id(), format!("premium-{}", premium.id));
    assert_eq!(
        Transaction::id_from_order_id(&premium.order_id()),
        Some(premium.id.as_str())
    );

    assert_eq!(Transaction::id_from_order_id("refund-abc"), None);
    assert_eq!(Transaction::id_from_order_id("topup-"), None);
}

#[test]
fn test_request_ids_are_unique_per_attempt() {
    let a = Transaction::new_pending("u1", 10_000, TransactionKind::WalletTopUp).unwrap();
    let b = Transaction::new_pending("u1", 10_000, TransactionKind::WalletTopUp).unwrap();
    assert_ne!(a.id, b.id);
    assert_ne!(a.provider_request_id, b.provider_request_id);
}
