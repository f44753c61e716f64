//! Builds the configured process-file store.

use std::sync::Arc;

use tracing::{info, warn};

use procfile_core::config::{DatabaseBackend, DatabaseConfig};
use procfile_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::migration::run_migrations;
use crate::store::ProcessFileStore;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;

/// Instantiate the store selected by `database.backend`, running
/// migrations first when configured.
pub async fn build_store(config: &DatabaseConfig) -> AppResult<Arc<dyn ProcessFileStore>> {
    let store: Arc<dyn ProcessFileStore> = match config.backend {
        DatabaseBackend::Postgres => {
            let db = DatabasePool::connect(config).await?;
            if config.run_migrations {
                run_migrations(db.pool()).await?;
            }
            Arc::new(PgStore::new(db.into_pool()))
        }
        DatabaseBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    info!(backend = store.backend(), "Process-file store ready");
    Ok(store)
}
