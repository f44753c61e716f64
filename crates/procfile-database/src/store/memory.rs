//! In-memory store.
//!
//! Committed rows live behind one `RwLock`. A transaction stages its
//! writes privately and applies them under the write lock at commit, so
//! readers see either the state before or after it, never a mix.
//! Equipment and file locks are per-key async mutexes whose owned guards
//! travel with the transaction and are released when it ends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use procfile_core::error::{AppError, ConflictReason};
use procfile_core::result::AppResult;
use procfile_core::types::pagination::{PageRequest, PageResponse};
use procfile_entity::approval::ApprovalRecord;
use procfile_entity::equipment::Equipment;
use procfile_entity::process_file::{ProcessFile, ProcessFileFilter, ProcessFileStatus};
use procfile_entity::seal::Seal;
use procfile_entity::signature::Signature;

use super::{ProcessFileStore, StoreTransaction};

#[derive(Debug, Default)]
struct Tables {
    equipment: HashMap<Uuid, Equipment>,
    files: HashMap<Uuid, ProcessFile>,
    /// File ids in insertion order, the tie-breaker for equal timestamps.
    file_order: Vec<Uuid>,
    signatures: Vec<Signature>,
    approvals: Vec<ApprovalRecord>,
    seals: Vec<Seal>,
}

impl Tables {
    fn files_in_order(&self) -> impl Iterator<Item = &ProcessFile> {
        self.file_order.iter().filter_map(|id| self.files.get(id))
    }

    fn approvals_for(&self, file_id: Uuid) -> Vec<ApprovalRecord> {
        let mut records: Vec<ApprovalRecord> = self
            .approvals
            .iter()
            .filter(|r| r.file_id == file_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| (a.level, a.created_at).cmp(&(b.level, b.created_at)));
        records
    }

    fn seal_for(&self, file_id: Uuid) -> Option<Seal> {
        self.seals.iter().find(|s| s.file_id == file_id).cloned()
    }
}

type LockRegistry = DashMap<Uuid, Arc<Mutex<()>>>;

/// Process-file store held entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    equipment_locks: Arc<LockRegistry>,
    file_locks: Arc<LockRegistry>,
    file_no_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn page_of(files: Vec<ProcessFile>, page: &PageRequest) -> PageResponse<ProcessFile> {
    let total = files.len() as u64;
    PageResponse::new(page.slice(&files), *page, total)
}

#[async_trait]
impl ProcessFileStore for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            guards: Vec::new(),
            locked_equipment: HashSet::new(),
            locked_files: HashSet::new(),
            numbering_locked: false,
            staged_files: HashMap::new(),
            ops: Vec::new(),
        }))
    }

    async fn upsert_equipment(&self, equipment: &Equipment) -> AppResult<Equipment> {
        let mut tables = self.tables.write().await;
        let duplicate_no = tables
            .equipment
            .values()
            .any(|e| e.id != equipment.id && e.equipment_no == equipment.equipment_no);
        if duplicate_no {
            return Err(AppError::validation(format!(
                "Equipment number {} is already registered",
                equipment.equipment_no
            )));
        }
        tables.equipment.insert(equipment.id, equipment.clone());
        Ok(equipment.clone())
    }

    async fn find_equipment(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        Ok(self.tables.read().await.equipment.get(&id).cloned())
    }

    async fn find_file(&self, id: Uuid) -> AppResult<Option<ProcessFile>> {
        Ok(self.tables.read().await.files.get(&id).cloned())
    }

    async fn list_files(
        &self,
        filter: &ProcessFileFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        let tables = self.tables.read().await;
        let mut files: Vec<ProcessFile> = tables
            .files_in_order()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        files.reverse();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(files, page))
    }

    async fn list_by_statuses(
        &self,
        statuses: &[ProcessFileStatus],
        page: &PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        let tables = self.tables.read().await;
        let mut files: Vec<ProcessFile> = tables
            .files_in_order()
            .filter(|f| statuses.contains(&f.status))
            .cloned()
            .collect();
        // `None` sorts first, matching NULLS FIRST on ascending order.
        files.sort_by(|a, b| a.submit_time.cmp(&b.submit_time));
        Ok(page_of(files, page))
    }

    async fn find_current(&self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .values()
            .find(|f| f.equipment_id == equipment_id && f.is_current)
            .cloned())
    }

    async fn list_lineage(&self, equipment_id: Uuid, file_no: &str) -> AppResult<Vec<ProcessFile>> {
        let tables = self.tables.read().await;
        let mut files: Vec<ProcessFile> = tables
            .files
            .values()
            .filter(|f| f.equipment_id == equipment_id && f.file_no == file_no)
            .cloned()
            .collect();
        files.sort_by_key(|f| f.version);
        Ok(files)
    }

    async fn list_approvals(&self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>> {
        Ok(self.tables.read().await.approvals_for(file_id))
    }

    async fn list_signatures(&self, file_id: Uuid) -> AppResult<Vec<Signature>> {
        let tables = self.tables.read().await;
        let mut signatures: Vec<Signature> = tables
            .signatures
            .iter()
            .filter(|s| s.file_id == file_id)
            .cloned()
            .collect();
        signatures.sort_by_key(|s| s.created_at);
        Ok(signatures)
    }

    async fn find_signature(&self, id: Uuid) -> AppResult<Option<Signature>> {
        let tables = self.tables.read().await;
        Ok(tables.signatures.iter().find(|s| s.id == id).cloned())
    }

    async fn find_seal_by_file(&self, file_id: Uuid) -> AppResult<Option<Seal>> {
        Ok(self.tables.read().await.seal_for(file_id))
    }
}

/// A write staged by a [`MemoryTransaction`].
#[derive(Debug, Clone)]
enum StagedOp {
    InsertFile(ProcessFile),
    UpdateFile {
        file: ProcessFile,
        expected_status: ProcessFileStatus,
        expected_row_version: i64,
    },
    SetCurrent {
        file_id: Uuid,
        is_current: bool,
    },
    InsertSignature(Signature),
    InsertApproval(ApprovalRecord),
    InsertSeal(Seal),
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    store: MemoryStore,
    guards: Vec<OwnedMutexGuard<()>>,
    locked_equipment: HashSet<Uuid>,
    locked_files: HashSet<Uuid>,
    numbering_locked: bool,
    /// This transaction's view of every file it wrote.
    staged_files: HashMap<Uuid, ProcessFile>,
    ops: Vec<StagedOp>,
}

impl MemoryTransaction {
    async fn acquire(registry: &LockRegistry, key: Uuid) -> OwnedMutexGuard<()> {
        let mutex = registry
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    async fn lock_file(&mut self, file_id: Uuid) {
        if self.locked_files.insert(file_id) {
            let guard = Self::acquire(&self.store.file_locks, file_id).await;
            self.guards.push(guard);
        }
    }

    /// Committed files overlaid with this transaction's staged versions.
    async fn visible_files(&self, keep: impl Fn(&ProcessFile) -> bool) -> Vec<ProcessFile> {
        let tables = self.store.tables.read().await;
        let mut files: Vec<ProcessFile> = tables
            .files_in_order()
            .filter(|f| !self.staged_files.contains_key(&f.id))
            .filter(|f| keep(f))
            .cloned()
            .collect();
        files.extend(self.staged_files.values().filter(|f| keep(f)).cloned());
        files
    }

    async fn visible_file(&self, id: Uuid) -> Option<ProcessFile> {
        if let Some(file) = self.staged_files.get(&id) {
            return Some(file.clone());
        }
        self.store.tables.read().await.files.get(&id).cloned()
    }

    /// Replay the staged writes against the committed rows, returning the
    /// final state of every touched file, or the first violated rule.
    fn verify(&self, tables: &Tables) -> AppResult<HashMap<Uuid, ProcessFile>> {
        let mut touched: HashMap<Uuid, ProcessFile> = HashMap::new();

        for op in &self.ops {
            match op {
                StagedOp::InsertFile(file) => {
                    if tables.files.contains_key(&file.id) || touched.contains_key(&file.id) {
                        return Err(AppError::internal(format!(
                            "Process file {} already exists",
                            file.id
                        )));
                    }
                    if !tables.equipment.contains_key(&file.equipment_id) {
                        return Err(AppError::not_found(format!(
                            "Equipment {} not found",
                            file.equipment_id
                        )));
                    }
                    touched.insert(file.id, file.clone());
                }
                StagedOp::UpdateFile {
                    file,
                    expected_status,
                    expected_row_version,
                } => {
                    let stored = touched
                        .get(&file.id)
                        .or_else(|| tables.files.get(&file.id))
                        .ok_or_else(|| {
                            AppError::not_found(format!("Process file {} not found", file.id))
                        })?;
                    if stored.status != *expected_status
                        || stored.row_version != *expected_row_version
                    {
                        return Err(status_changed(file.id));
                    }
                    let mut next = file.clone();
                    next.row_version = expected_row_version + 1;
                    touched.insert(file.id, next);
                }
                StagedOp::SetCurrent {
                    file_id,
                    is_current,
                } => {
                    let mut next = touched
                        .get(file_id)
                        .or_else(|| tables.files.get(file_id))
                        .cloned()
                        .ok_or_else(|| {
                            AppError::not_found(format!("Process file {file_id} not found"))
                        })?;
                    next.is_current = *is_current;
                    next.row_version += 1;
                    touched.insert(*file_id, next);
                }
                StagedOp::InsertSeal(seal) => {
                    let staged_seals = self.ops.iter().filter(|o| {
                        matches!(o, StagedOp::InsertSeal(s) if s.file_id == seal.file_id)
                    });
                    if tables.seal_for(seal.file_id).is_some() || staged_seals.count() > 1 {
                        return Err(AppError::conflict(
                            ConflictReason::SealAlreadyIssued,
                            format!("Process file {} already has a seal", seal.file_id),
                        ));
                    }
                    if tables.seals.iter().any(|s| s.seal_no == seal.seal_no) {
                        return Err(AppError::internal(format!(
                            "Seal number {} collided",
                            seal.seal_no
                        )));
                    }
                }
                StagedOp::InsertSignature(_) | StagedOp::InsertApproval(_) => {}
            }
        }

        // Row-spanning rules over the post-commit state.
        let after = |id: &Uuid| touched.get(id).or_else(|| tables.files.get(id));
        let all_ids: HashSet<Uuid> = tables.files.keys().chain(touched.keys()).copied().collect();
        let equipments: HashSet<Uuid> = touched.values().map(|f| f.equipment_id).collect();
        for equipment_id in equipments {
            let rows: Vec<&ProcessFile> = all_ids
                .iter()
                .filter_map(after)
                .filter(|f| f.equipment_id == equipment_id)
                .collect();
            if rows.iter().filter(|f| f.is_current).count() > 1 {
                return Err(AppError::conflict(
                    ConflictReason::StatusChanged,
                    format!(
                        "Equipment {equipment_id} current process file was changed by another operation; reload and retry"
                    ),
                ));
            }
            if rows.iter().filter(|f| f.is_open()).count() > 1 {
                return Err(AppError::conflict(
                    ConflictReason::OpenFileExists,
                    format!("Equipment {equipment_id} already has an open process file"),
                ));
            }
        }
        for file in touched.values() {
            if !tables.files.contains_key(&file.id) || tables.files[&file.id].version != file.version {
                let taken = all_ids.iter().filter_map(after).any(|other| {
                    other.id != file.id && other.file_no == file.file_no && other.version == file.version
                });
                if taken {
                    return Err(AppError::conflict(
                        ConflictReason::FileNoTaken,
                        format!("File number {} version {} exists", file.file_no, file.version),
                    ));
                }
            }
            if let Some(parent_id) = file.parent_file_id {
                let sibling = all_ids
                    .iter()
                    .filter_map(after)
                    .any(|other| other.id != file.id && other.parent_file_id == Some(parent_id));
                if sibling {
                    return Err(AppError::conflict(
                        ConflictReason::ParentSuperseded,
                        format!("Process file {parent_id} already has a revision"),
                    ));
                }
            }
        }

        Ok(touched)
    }
}

fn status_changed(id: Uuid) -> AppError {
    AppError::conflict(
        ConflictReason::StatusChanged,
        format!("Process file {id} was changed by another operation; reload and retry"),
    )
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_equipment(&mut self, equipment_id: Uuid) -> AppResult<()> {
        let later_lock_held = !self.locked_files.is_empty() || self.numbering_locked;
        if later_lock_held && !self.locked_equipment.contains(&equipment_id) {
            return Err(AppError::internal(
                "Equipment lock requested after a file or numbering lock",
            ));
        }
        if self.locked_equipment.insert(equipment_id) {
            let guard = Self::acquire(&self.store.equipment_locks, equipment_id).await;
            self.guards.push(guard);
        }
        Ok(())
    }

    async fn lock_file_numbers(&mut self) -> AppResult<()> {
        if self.numbering_locked {
            return Ok(());
        }
        if !self.locked_files.is_empty() {
            return Err(AppError::internal(
                "File-number lock requested after a file lock",
            ));
        }
        let guard = self.store.file_no_lock.clone().lock_owned().await;
        self.guards.push(guard);
        self.numbering_locked = true;
        Ok(())
    }

    async fn find_equipment(&mut self, id: Uuid) -> AppResult<Option<Equipment>> {
        Ok(self.store.tables.read().await.equipment.get(&id).cloned())
    }

    async fn find_file(&mut self, id: Uuid) -> AppResult<Option<ProcessFile>> {
        Ok(self.visible_file(id).await)
    }

    async fn find_open_file(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        let files = self
            .visible_files(|f| f.equipment_id == equipment_id && f.is_open())
            .await;
        Ok(files.into_iter().next())
    }

    async fn find_current(&mut self, equipment_id: Uuid) -> AppResult<Option<ProcessFile>> {
        let files = self
            .visible_files(|f| f.equipment_id == equipment_id && f.is_current)
            .await;
        Ok(files.into_iter().next())
    }

    async fn find_child(&mut self, parent_id: Uuid) -> AppResult<Option<ProcessFile>> {
        let files = self
            .visible_files(|f| f.parent_file_id == Some(parent_id))
            .await;
        Ok(files.into_iter().next())
    }

    async fn file_no_in_use(&mut self, file_no: &str) -> AppResult<bool> {
        Ok(!self.visible_files(|f| f.file_no == file_no).await.is_empty())
    }

    async fn file_nos_with_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>> {
        let mut nos: Vec<String> = self
            .visible_files(|f| f.file_no.starts_with(prefix))
            .await
            .into_iter()
            .map(|f| f.file_no)
            .collect();
        nos.sort();
        nos.dedup();
        Ok(nos)
    }

    async fn list_approvals(&mut self, file_id: Uuid) -> AppResult<Vec<ApprovalRecord>> {
        let mut records = self.store.tables.read().await.approvals_for(file_id);
        records.extend(self.ops.iter().filter_map(|op| match op {
            StagedOp::InsertApproval(r) if r.file_id == file_id => Some(r.clone()),
            _ => None,
        }));
        records.sort_by(|a, b| (a.level, a.created_at).cmp(&(b.level, b.created_at)));
        Ok(records)
    }

    async fn find_seal_by_file(&mut self, file_id: Uuid) -> AppResult<Option<Seal>> {
        let staged = self.ops.iter().find_map(|op| match op {
            StagedOp::InsertSeal(s) if s.file_id == file_id => Some(s.clone()),
            _ => None,
        });
        match staged {
            Some(seal) => Ok(Some(seal)),
            None => Ok(self.store.tables.read().await.seal_for(file_id)),
        }
    }

    async fn insert_file(&mut self, file: &ProcessFile) -> AppResult<()> {
        self.staged_files.insert(file.id, file.clone());
        self.ops.push(StagedOp::InsertFile(file.clone()));
        Ok(())
    }

    async fn update_file_checked(
        &mut self,
        file: &ProcessFile,
        expected_status: ProcessFileStatus,
        expected_row_version: i64,
    ) -> AppResult<ProcessFile> {
        self.lock_file(file.id).await;

        let stored = self
            .visible_file(file.id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Process file {} not found", file.id)))?;
        if stored.status != expected_status || stored.row_version != expected_row_version {
            return Err(status_changed(file.id));
        }

        let mut next = file.clone();
        next.row_version = expected_row_version + 1;
        next.updated_at = Utc::now();
        self.staged_files.insert(next.id, next.clone());
        self.ops.push(StagedOp::UpdateFile {
            file: next.clone(),
            expected_status,
            expected_row_version,
        });
        Ok(next)
    }

    async fn set_current_flag(&mut self, file_id: Uuid, is_current: bool) -> AppResult<()> {
        self.lock_file(file_id).await;

        let mut file = self
            .visible_file(file_id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Process file {file_id} not found")))?;
        file.is_current = is_current;
        file.row_version += 1;
        self.staged_files.insert(file_id, file);
        self.ops.push(StagedOp::SetCurrent {
            file_id,
            is_current,
        });
        Ok(())
    }

    async fn insert_signature(&mut self, signature: &Signature) -> AppResult<()> {
        self.ops.push(StagedOp::InsertSignature(signature.clone()));
        Ok(())
    }

    async fn insert_approval(&mut self, record: &ApprovalRecord) -> AppResult<()> {
        self.ops.push(StagedOp::InsertApproval(record.clone()));
        Ok(())
    }

    async fn insert_seal(&mut self, seal: &Seal) -> AppResult<()> {
        let exists = self.find_seal_by_file(seal.file_id).await?.is_some();
        if exists {
            return Err(AppError::conflict(
                ConflictReason::SealAlreadyIssued,
                format!("Process file {} already has a seal", seal.file_id),
            ));
        }
        self.ops.push(StagedOp::InsertSeal(seal.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut tables = self.store.tables.write().await;
        let touched = self.verify(&tables)?;

        for op in &self.ops {
            match op {
                StagedOp::InsertFile(file) => tables.file_order.push(file.id),
                StagedOp::InsertSignature(s) => tables.signatures.push(s.clone()),
                StagedOp::InsertApproval(r) => tables.approvals.push(r.clone()),
                StagedOp::InsertSeal(s) => tables.seals.push(s.clone()),
                StagedOp::UpdateFile { .. } | StagedOp::SetCurrent { .. } => {}
            }
        }
        for (id, file) in touched {
            tables.files.insert(id, file);
        }

        debug!(ops = self.ops.len(), "Committed memory transaction");
        Ok(())
    }
}
