//! Seal entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Uniquely numbered stamp minted once a document becomes effective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Seal {
    /// Unique seal identifier.
    pub id: Uuid,
    /// Sealed document; at most one seal per document.
    pub file_id: Uuid,
    /// Globally unique seal number.
    pub seal_no: String,
    /// Seal type label.
    pub seal_type: String,
    /// Stamp text.
    pub content: String,
    /// Blob key of the stamp image, if one is configured.
    pub image_ref: Option<String>,
    /// Approval records this seal certifies, in level order.
    pub approval_ids: Vec<Uuid>,
    /// Approver whose final decision minted the seal.
    pub issued_by: Uuid,
    /// When the seal was minted.
    pub issued_at: DateTime<Utc>,
}
