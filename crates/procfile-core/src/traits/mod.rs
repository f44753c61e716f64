//! Core traits defined in `procfile-core` and implemented by other crates.

pub mod blob;

pub use blob::{BlobCategory, BlobStore};
