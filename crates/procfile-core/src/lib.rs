//! # procfile-core
//!
//! Core crate for the process-file service. Contains configuration schemas,
//! pagination types, the blob-store trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ConflictReason, ErrorKind};
pub use result::AppResult;
