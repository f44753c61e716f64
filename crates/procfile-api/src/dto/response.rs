//! Response DTOs.

use serde::{Deserialize, Serialize};

use procfile_core::types::pagination::PageResponse;
use procfile_entity::process_file::{ProcessFile, ProcessFileDetail};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Total item count.
    pub total: u64,
    /// Current page.
    pub page: u64,
    /// Items per page.
    pub page_size: u64,
    /// Total pages.
    pub total_pages: u64,
}

impl<T: Serialize> From<PageResponse<T>> for PaginatedResponse<T> {
    fn from(page: PageResponse<T>) -> Self {
        Self {
            items: page.items,
            total: page.total_items,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

/// A process file plus the fields derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFileView {
    /// Stored columns.
    #[serde(flatten)]
    pub file: ProcessFile,
    /// Numeric status code (`0`, `1`..`3`, `5`, `-1`, `-2`).
    pub status_code: i16,
    /// Effective but displaced by a later version.
    pub is_superseded: bool,
}

impl From<ProcessFile> for ProcessFileView {
    fn from(file: ProcessFile) -> Self {
        Self {
            status_code: file.status.code(),
            is_superseded: file.is_superseded(),
            file,
        }
    }
}

/// Detail payload: the document view with its history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFileDetailView {
    /// The document.
    pub file: ProcessFileView,
    /// Decisions ordered by level, then time.
    pub approvals: Vec<procfile_entity::approval::ApprovalRecord>,
    /// Signatures ordered by time.
    pub signatures: Vec<procfile_entity::signature::Signature>,
    /// Seal, once effective.
    pub seal: Option<procfile_entity::seal::Seal>,
}

impl From<ProcessFileDetail> for ProcessFileDetailView {
    fn from(detail: ProcessFileDetail) -> Self {
        Self {
            file: detail.file.into(),
            approvals: detail.approvals,
            signatures: detail.signatures,
            seal: detail.seal,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Store backend name and reachability.
    pub store: ComponentHealth,
    /// Blob store provider and reachability.
    pub blobs: ComponentHealth,
}

/// Health of one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Backend name.
    pub backend: String,
    /// Whether it answered.
    pub healthy: bool,
}
