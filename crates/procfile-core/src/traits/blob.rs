//! Blob store trait for signature images, seal stamps and uploaded documents.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Grouping of stored blobs; becomes the first segment of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobCategory {
    /// Hand-drawn signature images.
    Signature,
    /// Seal stamp images.
    Seal,
    /// Original process documents (spreadsheets).
    Document,
}

impl BlobCategory {
    /// Key prefix for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature => "signatures",
            Self::Seal => "seals",
            Self::Document => "documents",
        }
    }
}

/// Trait for binary storage backends.
///
/// Keys are content-addressed, so writing the same bytes twice yields the
/// same key and stored blobs are never modified. The transactional records
/// only carry the returned key. Implementations live in `procfile-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store `data` and return its key.
    async fn put(&self, category: BlobCategory, data: Bytes) -> AppResult<String>;

    /// Read a blob fully into memory. Unknown keys yield `NotFound`.
    async fn get(&self, key: &str) -> AppResult<Bytes>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
