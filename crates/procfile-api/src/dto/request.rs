//! Request DTOs with validation.
//!
//! Binary payloads (signature images, uploaded documents) travel as
//! standard base64 inside the JSON body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use procfile_core::error::AppError;
use procfile_entity::approval::ApprovalResult;
use procfile_entity::process_file::{ProcessFileFilter, ProcessFileStatus};
use procfile_service::{CreateProcessFile, Decision, DocumentUpload};

use crate::error::ApiError;

/// Uploaded original document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DocumentPayload {
    /// File name including extension.
    #[validate(length(min = 1, max = 255, message = "Document name is required"))]
    pub name: String,
    /// Base64-encoded bytes.
    #[validate(length(min = 1, message = "Document content is required"))]
    pub content_base64: String,
}

/// Create a process file, either a new lineage or a revision.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProcessFileRequest {
    /// Equipment the document configures.
    pub equipment_id: Uuid,
    /// Display name.
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    /// Business key for a new lineage; generated when absent.
    #[validate(length(max = 64))]
    pub file_no: Option<String>,
    /// Process parameters.
    pub content: serde_json::Value,
    /// Version being revised.
    pub parent_file_id: Option<Uuid>,
    /// Why the parent is being revised.
    #[validate(length(max = 2000))]
    pub change_reason: Option<String>,
    /// Free-form remark.
    #[validate(length(max = 2000))]
    pub remark: Option<String>,
    /// Original document.
    #[validate(nested)]
    pub document: Option<DocumentPayload>,
}

impl CreateProcessFileRequest {
    /// Validate and convert into the service command.
    pub fn into_command(self) -> Result<CreateProcessFile, ApiError> {
        self.validate()?;
        let document = match self.document {
            Some(doc) => Some(DocumentUpload {
                bytes: decode_base64("document", &doc.content_base64)?,
                name: doc.name,
            }),
            None => None,
        };
        Ok(CreateProcessFile {
            equipment_id: self.equipment_id,
            file_name: self.file_name,
            file_no: self.file_no,
            content: self.content,
            parent_file_id: self.parent_file_id,
            change_reason: self.change_reason,
            remark: self.remark,
            document,
        })
    }
}

/// Submit a draft into the approval chain.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequest {
    /// Base64-encoded signature image.
    #[validate(length(min = 1, message = "A signature image is required"))]
    pub signature_image: String,
}

impl SubmitRequest {
    /// Validate and decode the signature image.
    pub fn into_signature(self) -> Result<Bytes, ApiError> {
        self.validate()?;
        decode_base64("signature_image", &self.signature_image)
    }
}

/// Approve or reject at one level.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecisionRequest {
    /// Level being decided.
    pub level: u8,
    /// `approve` or `reject`.
    pub result: ApprovalResult,
    /// Reviewer comment; required on reject.
    #[validate(length(max = 2000))]
    pub opinion: Option<String>,
    /// Base64-encoded signature image.
    #[validate(length(min = 1, message = "A signature image is required"))]
    pub signature_image: String,
}

impl DecisionRequest {
    /// Validate and convert into the service decision.
    pub fn into_decision(self) -> Result<Decision, ApiError> {
        self.validate()?;
        Ok(Decision {
            signature_image: decode_base64("signature_image", &self.signature_image)?,
            level: self.level,
            result: self.result,
            opinion: self.opinion,
        })
    }
}

/// Query filters for the process-file list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessFileListQuery {
    /// Status name (`pending_level2`) or code (`2`).
    pub status: Option<String>,
    /// Equipment.
    pub equipment_id: Option<Uuid>,
    /// File number substring.
    pub file_no: Option<String>,
    /// Creator.
    pub creator_id: Option<Uuid>,
    /// Exact version.
    pub version: Option<i32>,
    /// Current flag.
    pub is_current: Option<bool>,
}

impl ProcessFileListQuery {
    /// Parse into a store filter.
    pub fn into_filter(self) -> Result<ProcessFileFilter, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<ProcessFileStatus>().map_err(AppError::validation))
            .transpose()?;
        Ok(ProcessFileFilter {
            status,
            equipment_id: self.equipment_id,
            file_no: self.file_no,
            creator_id: self.creator_id,
            version: self.version,
            is_current: self.is_current,
        })
    }
}

fn decode_base64(field: &str, value: &str) -> Result<Bytes, ApiError> {
    STANDARD
        .decode(value.trim())
        .map(Bytes::from)
        .map_err(|e| ApiError(AppError::validation(format!("{field} is not valid base64: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_accepts_names_and_codes() {
        let by_name = ProcessFileListQuery {
            status: Some("pending_level2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            by_name.into_filter().unwrap().status,
            Some(ProcessFileStatus::PendingLevel2)
        );

        let by_code = ProcessFileListQuery {
            status: Some("-1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            by_code.into_filter().unwrap().status,
            Some(ProcessFileStatus::Rejected)
        );

        let bad = ProcessFileListQuery {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }

    #[test]
    fn test_decision_decodes_signature() {
        let request = DecisionRequest {
            level: 1,
            result: ApprovalResult::Reject,
            opinion: Some("dimensions wrong".to_string()),
            signature_image: STANDARD.encode(b"sig"),
        };
        let decision = request.into_decision().unwrap();
        assert_eq!(&decision.signature_image[..], b"sig");
        assert_eq!(decision.result, ApprovalResult::Reject);
    }

    #[test]
    fn test_bad_base64_is_a_validation_error() {
        let request = SubmitRequest {
            signature_image: "***".to_string(),
        };
        let err = request.into_signature().unwrap_err();
        assert_eq!(err.0.kind, procfile_core::ErrorKind::Validation);
    }

    #[test]
    fn test_blank_file_name_fails_validation() {
        let request = CreateProcessFileRequest {
            equipment_id: Uuid::new_v4(),
            file_name: String::new(),
            file_no: None,
            content: serde_json::json!({}),
            parent_file_id: None,
            change_reason: None,
            remark: None,
            document: None,
        };
        assert!(request.into_command().is_err());
    }
}
