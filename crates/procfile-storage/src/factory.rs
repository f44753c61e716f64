//! Builds the configured blob store.

use std::sync::Arc;

use tracing::info;

use procfile_core::config::{StorageBackend, StorageConfig};
use procfile_core::result::AppResult;
use procfile_core::traits::blob::BlobStore;

use crate::providers::{LocalBlobStore, MemoryBlobStore};

/// Instantiate the blob store selected by `storage.backend`.
pub async fn build_blob_store(config: &StorageConfig) -> AppResult<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => Arc::new(LocalBlobStore::new(&config.root_path).await?),
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };
    info!(provider = store.provider_type(), "Blob store ready");
    Ok(store)
}
