//! In-memory blob store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_core::traits::blob::{BlobCategory, BlobStore};

use crate::key::content_key;

/// Blob store backed by a concurrent map. Used by tests and the
/// `memory` storage backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, category: BlobCategory, data: Bytes) -> AppResult<String> {
        let key = content_key(category, &data);
        debug!(key, bytes = data.len(), "Stored blob in memory");
        self.blobs.entry(key.clone()).or_insert(data);
        Ok(key)
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.blobs
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {key}")))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.blobs.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_content_is_stored_once() {
        let store = MemoryBlobStore::new();
        let a = store
            .put(BlobCategory::Signature, Bytes::from_static(b"sig"))
            .await
            .unwrap();
        let b = store
            .put(BlobCategory::Signature, Bytes::from_static(b"sig"))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert!(store.exists(&a).await.unwrap());
        assert!(store.get("signatures/00/none").await.is_err());
    }
}
