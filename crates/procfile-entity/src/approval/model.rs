//! Approval record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_result", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalResult {
    /// Advance to the next level or finalize.
    Approve,
    /// Terminate the chain; an opinion is mandatory.
    Reject,
}

impl ApprovalResult {
    /// Return the result as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ApprovalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decision at one level. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApprovalRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Document decided on.
    pub file_id: Uuid,
    /// Level the decision was taken at.
    pub level: i16,
    /// Deciding user.
    pub approver_id: Uuid,
    /// Role the approver acted in.
    pub approver_role: String,
    /// Approve or reject.
    pub result: ApprovalResult,
    /// Reviewer comment; always present on rejections.
    pub opinion: Option<String>,
    /// Signature captured with the decision.
    pub signature_id: Uuid,
    /// When the decision was recorded.
    pub created_at: DateTime<Utc>,
}
