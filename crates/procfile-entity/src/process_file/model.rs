//! Process-file entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::ProcessFileStatus;

/// One version of a process document for a piece of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProcessFile {
    /// Unique document identifier.
    pub id: Uuid,
    /// Equipment this document configures.
    pub equipment_id: Uuid,
    /// Business key shared by every version of one lineage.
    pub file_no: String,
    /// Display name.
    pub file_name: String,
    /// Version within the lineage, starting at 1.
    pub version: i32,
    /// The version this one revises.
    pub parent_file_id: Option<Uuid>,
    /// Whether this is the document in force for the equipment.
    pub is_current: bool,
    /// Lifecycle status.
    pub status: ProcessFileStatus,
    /// Process parameters (JSON object).
    pub content: serde_json::Value,
    /// Why the parent was revised. Present exactly when `parent_file_id` is.
    pub change_reason: Option<String>,
    /// Blob key of the uploaded original document.
    pub document_ref: Option<String>,
    /// Original file name of the uploaded document.
    pub document_name: Option<String>,
    /// Size of the uploaded document in bytes.
    pub document_size: Option<i64>,
    /// Free-form remark.
    pub remark: Option<String>,
    /// User who created the document.
    pub creator_id: Uuid,
    /// When the document entered the approval chain.
    pub submit_time: Option<DateTime<Utc>>,
    /// When the final level approved.
    pub approval_time: Option<DateTime<Utc>>,
    /// When the document became effective.
    pub effective_time: Option<DateTime<Utc>>,
    /// When the document was invalidated.
    pub invalid_time: Option<DateTime<Utc>>,
    /// Seal minted on final approval.
    pub seal_id: Option<Uuid>,
    /// Optimistic concurrency counter, bumped on every update.
    pub row_version: i64,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProcessFile {
    /// Whether this is a revision of an earlier version.
    pub fn is_revision(&self) -> bool {
        self.parent_file_id.is_some()
    }

    /// An effective document that a later version has displaced.
    pub fn is_superseded(&self) -> bool {
        self.status == ProcessFileStatus::Effective && !self.is_current
    }

    /// Whether the document still awaits a decision (`Draft` or pending).
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
