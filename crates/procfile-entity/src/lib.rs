//! # procfile-entity
//!
//! Domain entity models for the process-file service. Every struct in this
//! crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod approval;
pub mod equipment;
pub mod process_file;
pub mod seal;
pub mod signature;
