//! Filters for process-file listings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::ProcessFile;
use super::status::ProcessFileStatus;

/// Filter set for the paged process-file list. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessFileFilter {
    /// Exact status.
    pub status: Option<ProcessFileStatus>,
    /// Exact equipment.
    pub equipment_id: Option<Uuid>,
    /// Case-insensitive substring of the file number.
    pub file_no: Option<String>,
    /// Exact creator.
    pub creator_id: Option<Uuid>,
    /// Exact version.
    pub version: Option<i32>,
    /// Current flag.
    pub is_current: Option<bool>,
}

impl ProcessFileFilter {
    /// Filter for one equipment only.
    pub fn for_equipment(equipment_id: Uuid) -> Self {
        Self {
            equipment_id: Some(equipment_id),
            ..Self::default()
        }
    }

    /// The file-number needle, trimmed, or `None` when blank.
    pub fn file_no_needle(&self) -> Option<&str> {
        self.file_no
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Evaluate the filter against one row.
    pub fn matches(&self, file: &ProcessFile) -> bool {
        if self.status.is_some_and(|s| s != file.status) {
            return false;
        }
        if self.equipment_id.is_some_and(|e| e != file.equipment_id) {
            return false;
        }
        if self.creator_id.is_some_and(|c| c != file.creator_id) {
            return false;
        }
        if self.version.is_some_and(|v| v != file.version) {
            return false;
        }
        if self.is_current.is_some_and(|c| c != file.is_current) {
            return false;
        }
        match self.file_no_needle() {
            Some(needle) => file
                .file_no
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
