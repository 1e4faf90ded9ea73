//! Service wiring shared by `main` and the HTTP tests

use std::sync::Arc;

use actix_web::web;
use tracing::{info, warn};

use crate::config::{Config, GatewayMode, StorageBackend};
use crate::core::{AppError, Result};
use crate::middleware::json_error_handler;
use crate::modules::entitlements::models::PlanCatalog;
use crate::modules::entitlements::repositories::{
    EntitlementRepository, MySqlEntitlementRepository,
};
use crate::modules::entitlements::services::{EntitlementApplier, PremiumService, WalletService};
use crate::modules::gateways::services::{
    MomoClient, PaymentGateway, SandboxGateway, SignatureVerifier,
};
use crate::modules::transactions::repositories::{
    InMemoryStore, MySqlTransactionRepository, TransactionRepository,
};
use crate::modules::transactions::services::{
    PaymentService, ReconciliationEngine, StalenessSweeper, TransactionService,
};
use crate::modules::{entitlements, health, transactions};

/// Both halves of persistence; the in-memory store serves as both
#[derive(Clone)]
pub struct Storage {
    pub transactions: Arc<dyn TransactionRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
}

impl Storage {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            transactions: store.clone(),
            entitlements: store,
        }
    }

    /// Open the configured backend; MySQL is migrated before use
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.database.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; state is lost on restart");
                Ok(Self::in_memory())
            }
            StorageBackend::Mysql => {
                let pool = config.database.create_pool().await?;
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| AppError::internal(format!("Migration failed: {}", e)))?;

                info!(
                    "Database pool initialized ({} connections)",
                    config.database.pool_size
                );

                Ok(Self {
                    transactions: Arc::new(MySqlTransactionRepository::new(pool.clone())),
                    entitlements: Arc::new(MySqlEntitlementRepository::new(pool)),
                })
            }
        }
    }
}

/// Pick the provider client for the configured gateway mode
pub fn build_gateway(config: &Config) -> Result<Arc<dyn PaymentGateway>> {
    match config.momo.mode {
        GatewayMode::Live => Ok(Arc::new(MomoClient::new(config.momo.clone())?)),
        GatewayMode::Sandbox => {
            warn!("MoMo sandbox gateway active; no real payments are created");
            Ok(Arc::new(SandboxGateway::new(config.momo.frontend_url.clone())))
        }
    }
}

/// Every service the HTTP layer hands to its handlers
#[derive(Clone)]
pub struct AppServices {
    pub transaction_repo: Arc<dyn TransactionRepository>,
    pub payments: Arc<PaymentService>,
    pub engine: Arc<ReconciliationEngine>,
    pub transactions: Arc<TransactionService>,
    pub wallets: Arc<WalletService>,
    pub premium: Arc<PremiumService>,
}

impl AppServices {
    pub fn new(config: &Config, storage: Storage, gateway: Arc<dyn PaymentGateway>) -> Self {
        let catalog = PlanCatalog;
        let applier = EntitlementApplier::new(catalog);
        let verifier = SignatureVerifier::from_config(&config.momo);

        let premium = PremiumService::new(storage.entitlements.clone(), applier);
        let sweeper = StalenessSweeper::new(storage.transactions.clone(), &config.reconciliation);

        Self {
            transaction_repo: storage.transactions.clone(),
            payments: Arc::new(PaymentService::new(
                storage.transactions.clone(),
                storage.entitlements.clone(),
                gateway.clone(),
                catalog,
            )),
            engine: Arc::new(ReconciliationEngine::new(
                storage.transactions.clone(),
                gateway,
                verifier,
                applier,
                config.reconciliation.poll_policy,
                config.momo.access_key.clone(),
            )),
            transactions: Arc::new(TransactionService::new(storage.transactions.clone(), sweeper)),
            wallets: Arc::new(WalletService::new(
                storage.transactions,
                storage.entitlements,
                premium.clone(),
            )),
            premium: Arc::new(premium),
        }
    }

    /// Register shared state and every route
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(self.transaction_repo.clone()))
            .app_data(web::Data::new(self.payments.clone()))
            .app_data(web::Data::new(self.engine.clone()))
            .app_data(web::Data::new(self.transactions.clone()))
            .app_data(web::Data::new(self.wallets.clone()))
            .app_data(web::Data::new(self.premium.clone()))
            .configure(health::configure)
            .configure(transactions::configure)
            .configure(entitlements::configure);
    }
}
