//! Signature entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// What the signature attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "signature_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    /// Creator handed the draft to the approval chain.
    Submit,
    /// An approver decided (either way) at a level.
    Approve,
}

impl SignatureKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable proof of a submit or decide action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Signature {
    /// Unique signature identifier.
    pub id: Uuid,
    /// Document signed.
    pub file_id: Uuid,
    /// Submit or approve.
    pub kind: SignatureKind,
    /// Approval level, absent for submit signatures.
    pub level: Option<i16>,
    /// Signing user.
    pub signer_id: Uuid,
    /// Role the signer acted in.
    pub signer_role: String,
    /// Blob key of the signature image.
    pub image_ref: String,
    /// Client IP address, when known.
    pub ip_address: Option<String>,
    /// Client device description, when known.
    pub device_info: Option<String>,
    /// When the signature was captured.
    pub created_at: DateTime<Utc>,
}
