//! Signature ledger: the append-only record of every submit and decision.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_core::traits::blob::{BlobCategory, BlobStore};
use procfile_database::store::{ProcessFileStore, StoreTransaction};
use procfile_entity::process_file::ApprovalLevel;
use procfile_entity::signature::{Signature, SignatureKind};

use crate::context::RequestContext;

/// Largest accepted signature image.
const MAX_SIGNATURE_BYTES: usize = 2 * 1024 * 1024;

/// Appends signatures inside the caller's transaction and serves them back.
#[derive(Debug, Clone)]
pub struct SignatureLedger {
    store: Arc<dyn ProcessFileStore>,
    blobs: Arc<dyn BlobStore>,
}

impl SignatureLedger {
    /// Creates a new signature ledger.
    pub fn new(store: Arc<dyn ProcessFileStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Reject an unusable signature image before any transaction starts.
    pub fn check_image(data: &[u8]) -> AppResult<()> {
        if data.is_empty() {
            return Err(AppError::validation("A signature image is required"));
        }
        if data.len() > MAX_SIGNATURE_BYTES {
            return Err(AppError::validation(format!(
                "Signature image exceeds {MAX_SIGNATURE_BYTES} bytes"
            )));
        }
        image::guess_format(data)
            .map_err(|_| AppError::validation("Signature is not a recognized image format"))?;
        Ok(())
    }

    /// Store the image and stage a new signature row in `tx`.
    ///
    /// The image goes to the blob store first; only its key is written to
    /// the transaction. A rolled-back transaction leaves an unreferenced
    /// blob behind, never a dangling reference.
    pub async fn append(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        file_id: Uuid,
        kind: SignatureKind,
        level: Option<ApprovalLevel>,
        image: Bytes,
    ) -> AppResult<Signature> {
        Self::check_image(&image)?;
        let image_ref = self.blobs.put(BlobCategory::Signature, image).await?;

        let signature = Signature {
            id: Uuid::new_v4(),
            file_id,
            kind,
            level: level.map(ApprovalLevel::as_i16),
            signer_id: ctx.actor_id,
            signer_role: ctx.role.clone(),
            image_ref,
            ip_address: ctx.ip_address.clone(),
            device_info: ctx.user_agent.clone(),
            created_at: Utc::now(),
        };
        tx.insert_signature(&signature).await?;

        debug!(
            signature_id = %signature.id,
            file_id = %file_id,
            kind = %kind,
            "Signature staged"
        );
        Ok(signature)
    }

    /// Every signature of a file, oldest first.
    pub async fn list_by_file(&self, file_id: Uuid) -> AppResult<Vec<Signature>> {
        self.store.list_signatures(file_id).await
    }

    /// The image bytes of one signature.
    pub async fn image(&self, signature_id: Uuid) -> AppResult<(Signature, Bytes)> {
        let signature = self
            .store
            .find_signature(signature_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Signature {signature_id} not found")))?;
        let bytes = self.blobs.get(&signature.image_ref).await?;
        Ok((signature, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procfile_core::ErrorKind;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_image_checks() {
        assert_eq!(
            SignatureLedger::check_image(&[]).unwrap_err().kind,
            ErrorKind::Validation
        );
        assert!(SignatureLedger::check_image(PNG_HEADER).is_ok());
        assert!(SignatureLedger::check_image(b"not an image").is_err());
        let huge = vec![0u8; MAX_SIGNATURE_BYTES + 1];
        assert!(SignatureLedger::check_image(&huge).is_err());
    }
}
