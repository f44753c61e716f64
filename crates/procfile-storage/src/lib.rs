//! # procfile-storage
//!
//! Blob store implementations for signature images, seal stamps and
//! uploaded process documents. Every backend addresses blobs by the
//! SHA-256 of their content.

pub mod factory;
pub mod key;
pub mod providers;

pub use factory::build_blob_store;
pub use key::content_key;
pub use providers::{LocalBlobStore, MemoryBlobStore};
