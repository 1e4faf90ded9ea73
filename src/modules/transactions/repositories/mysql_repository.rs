use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use tracing::debug;

use super::transaction_repository::TransactionRepository;
use crate::core::{AppError, Result};
use crate::modules::entitlements::models::TopUpTotals;
use crate::modules::entitlements::repositories::apply_entitlement;
use crate::modules::transactions::models::{
    StatusTransition, Transaction, TransactionKind, TransactionStatus, TransitionOutcome,
};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, user_id, amount, kind, plan_id, status, provider_request_id,
        provider_transaction_id, status_reason, created_at, updated_at
    FROM payment_transactions
"#;

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: String,
    amount: i64,
    kind: String,
    plan_id: Option<String>,
    status: String,
    provider_request_id: String,
    provider_transaction_id: Option<String>,
    status_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let status = row
            .status
            .parse::<TransactionStatus>()
            .map_err(AppError::Internal)?;

        Ok(Transaction {
            kind: TransactionKind::from_parts(&row.kind, row.plan_id)?,
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            status,
            provider_request_id: row.provider_request_id,
            provider_transaction_id: row.provider_transaction_id,
            status_reason: row.status_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// MySQL-backed transaction store
///
/// The compare-and-set is a conditional `UPDATE ... WHERE status = 'pending'`;
/// the entitlement write shares its database transaction, so the status
/// change and the credit commit or roll back together.
pub struct MySqlTransactionRepository {
    pool: MySqlPool,
}

impl MySqlTransactionRepository {
    /// Create a new MySqlTransactionRepository
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<Transaction>> {
        let sql = format!("{} WHERE {} = ?", SELECT_COLUMNS, clause);
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch transaction: {}", e)))?;

        row.map(Transaction::try_from).transpose()
    }
}

#[async_trait]
impl TransactionRepository for MySqlTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, user_id, amount, kind, plan_id, status, provider_request_id,
                provider_transaction_id, status_reason, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(transaction.amount)
        .bind(transaction.kind.code())
        .bind(transaction.kind.plan_id())
        .bind(transaction.status.as_str())
        .bind(&transaction.provider_request_id)
        .bind(&transaction.provider_transaction_id)
        .bind(&transaction.status_reason)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create transaction: {}", e)))?;

        Ok(transaction.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>> {
        self.fetch_one_where("id", id).await
    }

    async fn find_by_provider_request_id(&self, request_id: &str) -> Result<Option<Transaction>> {
        self.fetch_one_where("provider_request_id", request_id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let sql = format!("{} WHERE user_id = ? ORDER BY created_at DESC", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list transactions: {}", e)))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn latest_successful_premium(&self, user_id: &str) -> Result<Option<Transaction>> {
        let sql = format!(
            "{} WHERE user_id = ? AND kind = ? AND status = ? ORDER BY updated_at DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(user_id)
            .bind(TransactionKind::PREMIUM_PURCHASE)
            .bind(TransactionStatus::Success.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch premium purchase: {}", e)))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn sum_successful_top_ups(&self, user_id: &str) -> Result<TopUpTotals> {
        let (total_amount, count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT CAST(COALESCE(SUM(amount), 0) AS SIGNED), COUNT(*)
            FROM payment_transactions
            WHERE user_id = ? AND kind = ? AND status = ?
            "#,
        )
        .bind(user_id)
        .bind(TransactionKind::WALLET_TOP_UP)
        .bind(TransactionStatus::Success.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sum top-ups: {}", e)))?;

        Ok(TopUpTotals {
            total_amount,
            count,
        })
    }

    async fn transition_status(
        &self,
        id: &str,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome> {
        if !TransactionStatus::Pending.can_transition_to(transition.to) {
            return Err(AppError::internal(format!(
                "Refusing transition to non-terminal status {}",
                transition.to
            )));
        }

        let now = Utc::now();
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = ?,
                provider_transaction_id = COALESCE(?, provider_transaction_id),
                status_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(transition.to.as_str())
        .bind(&transition.provider_transaction_id)
        .bind(&transition.reason)
        .bind(now)
        .bind(id)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update transaction status: {}", e)))?;

        if result.rows_affected() == 0 {
            db_tx
                .rollback()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to roll back: {}", e)))?;

            let current = self
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Transaction '{}'", id)))?;

            if !current.is_terminal() {
                return Err(AppError::internal(format!(
                    "Conditional update of pending transaction '{}' matched no rows",
                    id
                )));
            }

            debug!(
                transaction_id = %id,
                status = %current.status,
                "Compare-and-set found terminal row"
            );
            return Ok(TransitionOutcome::AlreadyTerminal(current));
        }

        if let Some(entitlement) = &transition.entitlement {
            apply_entitlement(&mut *db_tx, entitlement, now).await?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit status transition: {}", e)))?;

        let updated = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!("Transaction '{}' vanished after update", id))
            })?;

        Ok(TransitionOutcome::Applied(updated))
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}
