//! # procfile-database
//!
//! Persistence for process files and the records they own. The
//! [`ProcessFileStore`](store::ProcessFileStore) contract is implemented
//! twice: on PostgreSQL through `sqlx`, and in memory for tests and
//! single-node demos.

pub mod connection;
pub mod error;
pub mod factory;
pub mod migration;
pub mod store;

pub use connection::DatabasePool;
pub use factory::build_store;
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::{ProcessFileStore, StoreTransaction};
