//! Version registry: lineage identity and the single-current rule.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use procfile_core::config::{FileNoConfig, StorageConfig};
use procfile_core::error::{AppError, ConflictReason};
use procfile_core::result::AppResult;
use procfile_core::traits::blob::{BlobCategory, BlobStore};
use procfile_database::store::{ProcessFileStore, StoreTransaction};
use procfile_entity::equipment::Equipment;
use procfile_entity::process_file::{ProcessFile, ProcessFileStatus, TransitionAction};

use crate::context::RequestContext;

/// An uploaded original document.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Original file name, extension included.
    pub name: String,
    /// Raw file bytes.
    pub bytes: Bytes,
}

/// Input for creating a process file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProcessFile {
    /// Equipment the document configures.
    pub equipment_id: Uuid,
    /// Display name.
    pub file_name: String,
    /// Business key for a new lineage; generated when absent. Ignored for
    /// revisions, which inherit the parent's.
    pub file_no: Option<String>,
    /// Process parameters; must be a JSON object.
    pub content: serde_json::Value,
    /// The version being revised.
    pub parent_file_id: Option<Uuid>,
    /// Why the parent is being revised.
    pub change_reason: Option<String>,
    /// Free-form remark.
    pub remark: Option<String>,
    /// Original document, if uploaded.
    #[serde(skip)]
    pub document: Option<DocumentUpload>,
}

/// Assigns lineage and versions and keeps at most one current document per
/// equipment.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    store: Arc<dyn ProcessFileStore>,
    blobs: Arc<dyn BlobStore>,
    storage: StorageConfig,
    file_no: FileNoConfig,
}

impl VersionRegistry {
    /// Creates a new version registry.
    pub fn new(
        store: Arc<dyn ProcessFileStore>,
        blobs: Arc<dyn BlobStore>,
        storage: StorageConfig,
        file_no: FileNoConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            storage,
            file_no,
        }
    }

    /// Seed or refresh an equipment row.
    pub async fn register_equipment(&self, equipment: &Equipment) -> AppResult<Equipment> {
        if equipment.equipment_no.trim().is_empty() {
            return Err(AppError::validation("Equipment number is required"));
        }
        self.store.upsert_equipment(equipment).await
    }

    /// Create a new `Draft` document, either a lineage root or a revision of
    /// `parent_file_id`.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateProcessFile,
    ) -> AppResult<ProcessFile> {
        let file_name = input.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(AppError::validation("File name is required"));
        }
        if !input.content.is_object() {
            return Err(AppError::validation(
                "Process content must be a JSON object",
            ));
        }
        let change_reason = non_blank(input.change_reason);
        match (input.parent_file_id, &change_reason) {
            (Some(_), None) => {
                return Err(AppError::validation(
                    "A change reason is required when revising a document",
                ));
            }
            (None, Some(_)) => {
                return Err(AppError::validation(
                    "A change reason only applies to revisions",
                ));
            }
            _ => {}
        }
        let supplied_no = match non_blank(input.file_no) {
            Some(no) if input.parent_file_id.is_none() => Some(check_file_no(no)?),
            _ => None,
        };

        let document = match input.document {
            Some(doc) => Some(self.store_document(doc).await?),
            None => None,
        };

        let mut tx = self.store.begin().await?;
        tx.lock_equipment(input.equipment_id).await?;

        if tx.find_equipment(input.equipment_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Equipment {} not found",
                input.equipment_id
            )));
        }

        let parent = match input.parent_file_id {
            Some(parent_id) => match tx.find_file(parent_id).await? {
                Some(p) if p.equipment_id == input.equipment_id => Some(p),
                _ => {
                    return Err(AppError::not_found(format!(
                        "Parent file {parent_id} not found for equipment {}",
                        input.equipment_id
                    )));
                }
            },
            None => None,
        };

        if let Some(open) = tx.find_open_file(input.equipment_id).await? {
            warn!(
                equipment_id = %input.equipment_id,
                open_file_id = %open.id,
                "Create refused: open file exists"
            );
            return Err(AppError::conflict(
                ConflictReason::OpenFileExists,
                format!(
                    "Process file {} ({}) is still open for equipment {}",
                    open.file_no, open.status, input.equipment_id
                ),
            ));
        }

        let (file_no, version) = match &parent {
            Some(p) => {
                if let Some(child) = tx.find_child(p.id).await? {
                    return Err(AppError::conflict(
                        ConflictReason::ParentSuperseded,
                        format!(
                            "Version {} of {} was already revised by {}",
                            p.version, p.file_no, child.id
                        ),
                    ));
                }
                (p.file_no.clone(), p.version + 1)
            }
            None => {
                tx.lock_file_numbers().await?;
                let no = match supplied_no {
                    Some(no) => {
                        if tx.file_no_in_use(&no).await? {
                            return Err(AppError::conflict(
                                ConflictReason::FileNoTaken,
                                format!("File number {no} is already in use"),
                            ));
                        }
                        no
                    }
                    None => self.generate_file_no(tx.as_mut()).await?,
                };
                (no, 1)
            }
        };

        let now = Utc::now();
        let (document_ref, document_name, document_size) = match document {
            Some((key, name, size)) => (Some(key), Some(name), Some(size)),
            None => (None, None, None),
        };
        let file = ProcessFile {
            id: Uuid::new_v4(),
            equipment_id: input.equipment_id,
            file_no,
            file_name,
            version,
            parent_file_id: parent.as_ref().map(|p| p.id),
            is_current: false,
            status: ProcessFileStatus::Draft,
            content: input.content,
            change_reason,
            document_ref,
            document_name,
            document_size,
            remark: non_blank(input.remark),
            creator_id: ctx.actor_id,
            submit_time: None,
            approval_time: None,
            effective_time: None,
            invalid_time: None,
            seal_id: None,
            row_version: 0,
            created_at: now,
            updated_at: now,
        };
        tx.insert_file(&file).await?;
        tx.commit().await?;

        info!(
            file_id = %file.id,
            equipment_id = %file.equipment_id,
            file_no = %file.file_no,
            version = file.version,
            "Process file created"
        );
        Ok(file)
    }

    /// Make `file` the current document of its equipment inside `tx`,
    /// clearing the flag on whichever document held it.
    ///
    /// The caller must already hold the equipment lock.
    pub async fn promote_to_current(
        &self,
        tx: &mut dyn StoreTransaction,
        file: &ProcessFile,
    ) -> AppResult<()> {
        if let Some(previous) = tx.find_current(file.equipment_id).await? {
            if previous.id == file.id {
                return Ok(());
            }
            tx.set_current_flag(previous.id, false).await?;
            debug!(
                equipment_id = %file.equipment_id,
                demoted = %previous.id,
                "Previous current file demoted"
            );
        }
        tx.set_current_flag(file.id, true).await
    }

    /// Retire an `Effective` document: clear its current flag and mark it
    /// `Invalidated`.
    pub async fn invalidate_current(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> AppResult<ProcessFile> {
        let snapshot = self
            .store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Process file {file_id} not found")))?;
        let next = snapshot
            .status
            .apply(TransitionAction::Invalidate)
            .ok_or_else(|| {
                AppError::state(format!(
                    "Only effective documents can be invalidated; {file_id} is {}",
                    snapshot.status
                ))
            })?;

        let mut tx = self.store.begin().await?;
        tx.lock_equipment(snapshot.equipment_id).await?;

        let now = Utc::now();
        let mut updated = snapshot.clone();
        updated.status = next;
        updated.is_current = false;
        updated.invalid_time = Some(now);
        updated.updated_at = now;
        let stored = tx
            .update_file_checked(&updated, snapshot.status, snapshot.row_version)
            .await?;
        tx.commit().await?;

        info!(
            file_id = %file_id,
            equipment_id = %stored.equipment_id,
            actor_id = %ctx.actor_id,
            from = %snapshot.status,
            to = %stored.status,
            "Process file invalidated"
        );
        Ok(stored)
    }

    async fn store_document(&self, doc: DocumentUpload) -> AppResult<(String, String, i64)> {
        let name = doc.name.trim().to_string();
        if !self.storage.is_allowed_document(&name) {
            return Err(AppError::validation(format!(
                "Unsupported document type: {name}; allowed: {}",
                self.storage.allowed_document_extensions.join(", ")
            )));
        }
        if doc.bytes.is_empty() {
            return Err(AppError::validation("Uploaded document is empty"));
        }
        let size = doc.bytes.len() as u64;
        if size > self.storage.max_document_bytes {
            return Err(AppError::validation(format!(
                "Document exceeds {} bytes",
                self.storage.max_document_bytes
            )));
        }
        let key = self.blobs.put(BlobCategory::Document, doc.bytes).await?;
        debug!(key = %key, name = %name, size, "Document stored");
        Ok((key, name, size as i64))
    }

    async fn generate_file_no(&self, tx: &mut dyn StoreTransaction) -> AppResult<String> {
        let today = Utc::now().date_naive();
        let stem = format!("{}{}", self.file_no.prefix, today.format("%Y%m%d"));
        let existing = tx.file_nos_with_prefix(&stem).await?;
        next_file_no(&self.file_no.prefix, today, &existing)
    }
}

/// `{prefix}{yyyyMMdd}{seq:03}` with `seq` one past the day's highest.
/// Numbers with a non-numeric tail after the date are ignored, as are tails
/// too large for a `u64`.
fn next_file_no(prefix: &str, date: NaiveDate, existing: &[String]) -> AppResult<String> {
    let stem = format!("{prefix}{}", date.format("%Y%m%d"));
    let highest = existing
        .iter()
        .filter_map(|no| no.strip_prefix(&stem))
        .filter(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|tail| tail.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let next = highest.checked_add(1).ok_or_else(|| {
        AppError::conflict(
            ConflictReason::FileNoTaken,
            format!("File numbers for {stem} are exhausted; supply a file number"),
        )
    })?;
    Ok(format!("{stem}{next:03}"))
}

fn check_file_no(no: String) -> AppResult<String> {
    if no.contains('/') || no.contains('\\') || no.contains("..") {
        return Err(AppError::validation(format!(
            "File number {no} contains illegal characters"
        )));
    }
    Ok(no)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_first_file_no_of_the_day() {
        assert_eq!(next_file_no("PF", day(), &[]).unwrap(), "PF20261019001");
    }

    #[test]
    fn test_file_no_follows_highest_sequence() {
        let existing = vec![
            "PF20261019001".to_string(),
            "PF20261019007".to_string(),
            "PF20261019003".to_string(),
        ];
        assert_eq!(next_file_no("PF", day(), &existing).unwrap(), "PF20261019008");
    }

    #[test]
    fn test_file_no_ignores_foreign_suffixes() {
        let existing = vec![
            "PF20261019002".to_string(),
            "PF20261019-manual".to_string(),
            "PF20261019".to_string(),
        ];
        assert_eq!(next_file_no("PF", day(), &existing).unwrap(), "PF20261019003");
    }

    #[test]
    fn test_file_no_grows_past_three_digits() {
        let existing = vec!["PF20261019999".to_string()];
        assert_eq!(next_file_no("PF", day(), &existing).unwrap(), "PF202610191000");
    }

    #[test]
    fn test_file_no_past_u32_range() {
        let existing = vec![format!("PF20261019{}", u32::MAX)];
        assert_eq!(
            next_file_no("PF", day(), &existing).unwrap(),
            format!("PF20261019{}", u64::from(u32::MAX) + 1)
        );
    }

    #[test]
    fn test_file_no_sequence_exhausted_is_refused() {
        let existing = vec![
            format!("PF20261019{}", u64::MAX),
            "PF2026101999999999999999999999".to_string(),
        ];
        let err = next_file_no("PF", day(), &existing).unwrap_err();
        assert_eq!(err.conflict_reason(), Some(ConflictReason::FileNoTaken));
    }

    #[test]
    fn test_supplied_file_no_rejects_path_characters() {
        assert!(check_file_no("PF-01".to_string()).is_ok());
        assert!(check_file_no("a/b".to_string()).is_err());
        assert!(check_file_no("a\\b".to_string()).is_err());
        assert!(check_file_no("..x".to_string()).is_err());
    }

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank(Some("  why ".to_string())), Some("why".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
