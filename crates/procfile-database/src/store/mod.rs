//! The process-file store contract.
//!
//! Reads on [`ProcessFileStore`] never block on writers and observe only
//! committed state. Every mutation goes through a [`StoreTransaction`],
//! which commits all of its writes or none of them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use procfile_core::result::AppResult;
use procfile_core::types::pagination::{PageRequest, PageResponse};
use procfile_entity::approval::ApprovalRecord;
use procfile_entity::equipment::Equipment;
use procfile_entity::process_file::{ProcessFile, ProcessFileFilter, ProcessFileStatus};
use procfile_entity::seal::Seal;
use procfile_entity::signature::Signature;

/// Committed-state reads and the entry point for transactions.
#[async_trait]
pub trait ProcessFileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name (e.g., "postgres", "memory").
    fn backend(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Start a transaction.
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;

    /// Insert or replace an equipment row.
    async fn upsert_equipment(&self, equipment: &Equipment) -> AppResult<Equipment>;

    /// Find an equipment row by ID.
    async fn find_equipment(&self, id: Uuid) -> AppResult<Option<Equipment>>;

    /// Find a process file by ID.
    async fn find_file(&self, id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// Paged list matching `filter`, newest first.
    async fn list_files(
        &self,
        filter: &ProcessFileFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>>;

    /// Paged list of files in any of `statuses`, oldest submission first.
    async fn list_by_statuses(
        &self,
        statuses: &[ProcessFileStatus],
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>>;

    /// The current file of an equipment.
    async fn find_current(&self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// Every version sharing `file_no` on one equipment, by version.
    async fn list_lineage(&self, equipment_id: Uuid, file_no: &str) -> AppResult<Vec<ProcessFile>>;

    /// Approval records of a file, by level then time.
    async fn list_approvals(&self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>>;

    /// Signatures of a file, by time.
    async fn list_signatures(&self, file_id: Uuid) -> AppResult<Vec<Signature>>;

    /// Find a signature by ID.
    async fn find_signature(&self, id: Uuid) -> AppResult<Option<Signature>>;

    /// The seal of a file.
    async fn find_seal_by_file(&self, file_id: Uuid) -> AppResult<Option<Seal>>;
}

/// One unit of work. Dropping it without [`commit`](Self::commit) discards
/// every staged write and releases its locks.
///
/// Lock order is equipment, then file numbering, then file: a transaction
/// that needs the equipment lock takes it before touching any file row.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Serialize against every other transaction holding the same
    /// equipment lock until this one ends.
    async fn lock_equipment(&mut self, equipment_id: Uuid) -> AppResult<()>;

    /// Serialize file-number allocation across the whole store until this
    /// transaction ends.
    async fn lock_file_numbers(&mut self) -> AppResult<()>;

    /// Find an equipment row by ID.
    async fn find_equipment(&mut self, id: Uuid) -> AppResult<Option<Equipment>>;

    /// Find a file, including writes staged by this transaction.
    async fn find_file(&mut self, id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// The `Draft`/pending file of an equipment, if any.
    async fn find_open_file(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// The current file of an equipment.
    async fn find_current(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// The file revising `parent_id`, if one exists.
    async fn find_child(&mut self, parent_id: Uuid) -> AppResult<Option<ProcessFile>>;

    /// Whether any file already uses `file_no`.
    async fn file_no_in_use(&mut self, file_no: &str) -> AppResult<bool>;

    /// Distinct file numbers starting with `prefix`.
    async fn file_nos_with_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>>;

    /// Approval records of a file, by level then time.
    async fn list_approvals(&mut self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>>;

    /// The seal of a file.
    async fn find_seal_by_file(&mut self, file_id: Uuid) -> AppResult<Option<Seal>>;

    /// Insert a new file row.
    async fn insert_file(&mut self, file: &ProcessFile) -> AppResult<()>;

    /// Overwrite the mutable columns of `file` if the stored row still has
    /// `expected_status` and `expected_row_version`, otherwise fail with
    /// `Conflict(StatusChanged)`. Returns the row with its bumped
    /// `row_version`.
    async fn update_file_checked(
        &mut self,
        file: &ProcessFile,
        expected_status: ProcessFileStatus,
        expected_row_version: i64,
    ) -> AppResult<ProcessFile>;

    /// Set or clear the current flag of a file.
    async fn set_current_flag(&mut self, file_id: Uuid, is_current: bool) -> AppResult<()>;

    /// Append a signature.
    async fn insert_signature(&mut self, signature: &Signature) -> AppResult<()>;

    /// Append an approval record.
    async fn insert_approval(&mut self, record: &ApprovalRecord) -> AppResult<()>;

    /// Store a seal.
    async fn insert_seal(&mut self, seal: &Seal) -> AppResult<()>;

    /// Make every staged write visible at once.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
