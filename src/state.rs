use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AppConfig, StorageBackend};
use crate::ledger::repo::LedgerStore;
use crate::ledger::repo_types::DailyLedger;
use crate::ledger::services::{Accumulator, SystemClock};
use crate::products::repo_types::Product;
use crate::profiles::repo_types::Profile;
use crate::store::{DeletedRows, EntityStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn EntityStore<Profile>>,
    pub products: Arc<dyn EntityStore<Product>>,
    pub ledger: Arc<dyn LedgerStore>,
    pub accumulator: Accumulator,
    /// Set only for the postgres backend.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        match config.backend {
            StorageBackend::Postgres => {
                let db = crate::db::connect(&config.db).await?;
                Ok(Self::postgres(db, config))
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn postgres(db: PgPool, config: Arc<AppConfig>) -> Self {
        let deleted = DeletedRows::from_flag(config.update_deleted_rows);
        let deadline = config.db.statement_timeout();
        let ledger: Arc<dyn LedgerStore> =
            Arc::new(PgStore::<DailyLedger>::new(db.clone(), deleted, deadline));
        Self {
            profiles: Arc::new(PgStore::<Profile>::new(db.clone(), deleted, deadline)),
            products: Arc::new(PgStore::<Product>::new(db.clone(), deleted, deadline)),
            accumulator: Accumulator::new(ledger.clone(), Arc::new(SystemClock)),
            ledger,
            db: Some(db),
            config,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let deleted = DeletedRows::from_flag(config.update_deleted_rows);
        let ledger: Arc<dyn LedgerStore> = Arc::new(MemoryStore::<DailyLedger>::new(deleted));
        Self {
            profiles: Arc::new(MemoryStore::<Profile>::new(deleted)),
            products: Arc::new(MemoryStore::<Product>::new(deleted)),
            accumulator: Accumulator::new(ledger.clone(), Arc::new(SystemClock)),
            ledger,
            db: None,
            config,
        }
    }
}
