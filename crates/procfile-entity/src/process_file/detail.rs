//! Aggregated view of one process file and the history it owns.

use serde::{Deserialize, Serialize};

use super::model::ProcessFile;
use crate::approval::ApprovalRecord;
use crate::seal::Seal;
use crate::signature::Signature;

/// A process file with its approval records, signatures and seal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFileDetail {
    /// The document itself.
    pub file: ProcessFile,
    /// Decisions ordered by level, then time.
    pub approvals: Vec<ApprovalRecord>,
    /// Signatures ordered by time.
    pub signatures: Vec<Signature>,
    /// Seal, present once the document reached `Effective`.
    pub seal: Option<Seal>,
}
