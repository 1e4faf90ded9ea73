use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlConnection, MySqlPool};

use crate::core::{AppError, Result};
use crate::modules::entitlements::models::{Entitlement, PremiumEntitlement, Wallet};
use crate::modules::transactions::models::{TransactionKind, TransactionStatus};

/// Cached wallet and premium state
///
/// The caches are written by the transaction store's compare-and-set (through
/// `apply_entitlement`) and by the balance rebuild; nothing else mutates them.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>>;

    /// Reset the cached balance to the sum of successful top-ups
    ///
    /// Sum and write are one step, so a credit committing concurrently is
    /// either counted or applied on top, never lost.
    async fn rebuild_balance(&self, user_id: &str) -> Result<Wallet>;

    async fn find_premium(&self, user_id: &str) -> Result<Option<PremiumEntitlement>>;

    /// Overwrite the cached premium assignment
    async fn store_premium(&self, premium: &PremiumEntitlement) -> Result<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    user_id: String,
    balance: i64,
    updated_at: DateTime<Utc>,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Wallet {
            user_id: row.user_id,
            balance: row.balance,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PremiumRow {
    user_id: String,
    has_premium: bool,
    premium_type: String,
    premium_expiry: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<PremiumRow> for PremiumEntitlement {
    fn from(row: PremiumRow) -> Self {
        PremiumEntitlement {
            user_id: row.user_id,
            has_premium: row.has_premium,
            premium_type: row.premium_type,
            premium_expiry: row.premium_expiry,
            updated_at: row.updated_at,
        }
    }
}

/// MySQL-backed wallet and premium caches
pub struct MySqlEntitlementRepository {
    pool: MySqlPool,
}

impl MySqlEntitlementRepository {
    /// Create a new MySqlEntitlementRepository
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementRepository for MySqlEntitlementRepository {
    async fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch wallet: {}", e)))?;

        Ok(row.map(Wallet::from))
    }

    async fn rebuild_balance(&self, user_id: &str) -> Result<Wallet> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance, created_at, updated_at)
            SELECT ?, CAST(COALESCE(SUM(amount), 0) AS SIGNED), ?, ?
            FROM payment_transactions
            WHERE user_id = ? AND kind = ? AND status = ?
            ON DUPLICATE KEY UPDATE balance = VALUES(balance), updated_at = VALUES(updated_at)
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .bind(user_id)
        .bind(TransactionKind::WALLET_TOP_UP)
        .bind(TransactionStatus::Success.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to rebuild wallet balance: {}", e)))?;

        self.find_wallet(user_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Wallet for '{}' vanished", user_id)))
    }

    async fn find_premium(&self, user_id: &str) -> Result<Option<PremiumEntitlement>> {
        let row = sqlx::query_as::<_, PremiumRow>(
            r#"
            SELECT user_id, has_premium, premium_type, premium_expiry, updated_at
            FROM premium_entitlements
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch premium entitlement: {}", e)))?;

        Ok(row.map(PremiumEntitlement::from))
    }

    async fn store_premium(&self, premium: &PremiumEntitlement) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to acquire connection: {}", e)))?;

        upsert_premium(&mut conn, premium).await
    }
}

/// Apply an entitlement on the caller's connection
///
/// Called only from inside the compare-and-set database transaction, after
/// the conditional status update changed the row.
pub async fn apply_entitlement(
    conn: &mut MySqlConnection,
    entitlement: &Entitlement,
    at: DateTime<Utc>,
) -> Result<()> {
    match entitlement {
        Entitlement::WalletCredit { user_id, amount } => {
            sqlx::query(
                r#"
                INSERT INTO wallets (user_id, balance, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    balance = balance + VALUES(balance),
                    updated_at = VALUES(updated_at)
                "#,
            )
            .bind(user_id)
            .bind(amount)
            .bind(at)
            .bind(at)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to credit wallet: {}", e)))?;

            Ok(())
        }
        Entitlement::PremiumActivation { .. } => match entitlement.premium_record(at) {
            Some(premium) => upsert_premium(conn, &premium).await,
            None => Ok(()),
        },
    }
}

async fn upsert_premium(conn: &mut MySqlConnection, premium: &PremiumEntitlement) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO premium_entitlements
            (user_id, has_premium, premium_type, premium_expiry, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            has_premium = VALUES(has_premium),
            premium_type = VALUES(premium_type),
            premium_expiry = VALUES(premium_expiry),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(&premium.user_id)
    .bind(premium.has_premium)
    .bind(&premium.premium_type)
    .bind(premium.premium_expiry)
    .bind(premium.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to store premium entitlement: {}", e)))?;

    Ok(())
}
