//! Read-side queries for the presentation collaborator.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_core::traits::blob::BlobStore;
use procfile_core::types::pagination::{PageRequest, PageResponse};
use procfile_database::store::ProcessFileStore;
use procfile_entity::process_file::{ProcessFile, ProcessFileDetail, ProcessFileFilter};
use procfile_entity::seal::Seal;
use procfile_entity::signature::Signature;

use crate::context::RequestContext;
use crate::ledger::SignatureLedger;
use crate::policy::ApprovalPolicy;
use crate::seal::SealIssuer;

/// An original document ready for download.
#[derive(Debug, Clone)]
pub struct DocumentDownload {
    /// File name as uploaded.
    pub name: String,
    /// Raw bytes.
    pub bytes: Bytes,
}

/// Non-blocking reads over committed state.
#[derive(Debug, Clone)]
pub struct ProcessFileQueryService {
    store: Arc<dyn ProcessFileStore>,
    blobs: Arc<dyn BlobStore>,
    ledger: Arc<SignatureLedger>,
    seals: Arc<SealIssuer>,
    policy: Arc<ApprovalPolicy>,
}

impl ProcessFileQueryService {
    /// Creates a new query service.
    pub fn new(
        store: Arc<dyn ProcessFileStore>,
        blobs: Arc<dyn BlobStore>,
        ledger: Arc<SignatureLedger>,
        seals: Arc<SealIssuer>,
        policy: Arc<ApprovalPolicy>,
    ) -> Self {
        Self {
            store,
            blobs,
            ledger,
            seals,
            policy,
        }
    }

    /// A single document.
    pub async fn get(&self, file_id: Uuid) -> AppResult<ProcessFile> {
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Process file {file_id} not found")))
    }

    /// A document with its approval records, signatures and seal.
    pub async fn get_detail(&self, file_id: Uuid) -> AppResult<ProcessFileDetail> {
        let file = self.get(file_id).await?;
        let approvals = self.store.list_approvals(file_id).await?;
        let signatures = self.ledger.list_by_file(file_id).await?;
        let seal = self.store.find_seal_by_file(file_id).await?;
        Ok(ProcessFileDetail {
            file,
            approvals,
            signatures,
            seal,
        })
    }

    /// Filtered list, newest first.
    pub async fn list(
        &self,
        filter: &ProcessFileFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        self.store.list_files(filter, &page.normalized()).await
    }

    /// Documents of one equipment, newest first.
    pub async fn list_by_equipment(
        &self,
        equipment_id: Uuid,
        page: PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        self.ensure_equipment(equipment_id).await?;
        self.list(&ProcessFileFilter::for_equipment(equipment_id), page)
            .await
    }

    /// Documents waiting on a level the actor's role decides, oldest
    /// submission first.
    pub async fn list_pending(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> AppResult<PageResponse<ProcessFile>> {
        let page = page.normalized();
        let statuses = self.policy.pending_statuses_for_role(&ctx.role);
        if statuses.is_empty() {
            return Ok(PageResponse::new(Vec::new(), page, 0));
        }
        self.store.list_by_statuses(&statuses, &page).await
    }

    /// Every version in the document's lineage, by version.
    pub async fn lineage(&self, file_id: Uuid) -> AppResult<Vec<ProcessFile>> {
        let file = self.get(file_id).await?;
        self.store
            .list_lineage(file.equipment_id, &file.file_no)
            .await
    }

    /// The current document of an equipment.
    pub async fn current_for_equipment(&self, equipment_id: Uuid) -> AppResult<ProcessFile> {
        self.ensure_equipment(equipment_id).await?;
        self.store
            .find_current(equipment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Equipment {equipment_id} has no current document"))
            })
    }

    /// Signatures of a document, oldest first.
    pub async fn signatures(&self, file_id: Uuid) -> AppResult<Vec<Signature>> {
        self.get(file_id).await?;
        self.ledger.list_by_file(file_id).await
    }

    /// The image of one signature.
    pub async fn signature_image(&self, signature_id: Uuid) -> AppResult<Bytes> {
        let (_, bytes) = self.ledger.image(signature_id).await?;
        Ok(bytes)
    }

    /// The seal record of a document.
    pub async fn seal(&self, file_id: Uuid) -> AppResult<Seal> {
        self.seals.find_by_file(file_id).await
    }

    /// The stamp image of a document's seal.
    pub async fn seal_image(&self, file_id: Uuid) -> AppResult<Bytes> {
        self.seals.image(file_id).await
    }

    /// The uploaded original document.
    pub async fn document(&self, file_id: Uuid) -> AppResult<DocumentDownload> {
        let file = self.get(file_id).await?;
        let (Some(key), Some(name)) = (file.document_ref, file.document_name) else {
            return Err(AppError::not_found(format!(
                "Process file {file_id} has no uploaded document"
            )));
        };
        let bytes = self.blobs.get(&key).await?;
        Ok(DocumentDownload { name, bytes })
    }

    async fn ensure_equipment(&self, equipment_id: Uuid) -> AppResult<()> {
        match self.store.find_equipment(equipment_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!(
                "Equipment {equipment_id} not found"
            ))),
        }
    }
}
