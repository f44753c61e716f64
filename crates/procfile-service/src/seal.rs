//! Seal issuer: mints the controlled seal of an effective document.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use procfile_core::config::SealConfig;
use procfile_core::error::{AppError, ConflictReason, ErrorKind};
use procfile_core::result::AppResult;
use procfile_core::traits::blob::{BlobCategory, BlobStore};
use procfile_database::store::{ProcessFileStore, StoreTransaction};
use procfile_entity::process_file::{ProcessFile, ProcessFileStatus};
use procfile_entity::seal::Seal;

/// Mints seals inside the final-approval transaction.
#[derive(Debug, Clone)]
pub struct SealIssuer {
    store: Arc<dyn ProcessFileStore>,
    blobs: Arc<dyn BlobStore>,
    config: SealConfig,
    /// Blob key of the stamp image, when one is configured.
    stamp_ref: Option<String>,
}

impl SealIssuer {
    /// Creates a seal issuer without a stamp image.
    pub fn new(
        store: Arc<dyn ProcessFileStore>,
        blobs: Arc<dyn BlobStore>,
        config: SealConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            config,
            stamp_ref: None,
        }
    }

    /// Creates a seal issuer and loads the configured stamp image into the
    /// blob store.
    pub async fn initialize(
        store: Arc<dyn ProcessFileStore>,
        blobs: Arc<dyn BlobStore>,
        config: SealConfig,
    ) -> AppResult<Self> {
        let mut issuer = Self::new(store, blobs, config);
        if let Some(path) = issuer.config.image_path.clone() {
            let data = tokio::fs::read(&path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to read seal stamp image {path}"),
                    e,
                )
            })?;
            issuer.install_stamp(Bytes::from(data)).await?;
        } else {
            warn!("No seal stamp image configured; seals will carry no image");
        }
        Ok(issuer)
    }

    /// Store `stamp` as the stamp image for every seal minted from now on.
    pub async fn install_stamp(&mut self, stamp: Bytes) -> AppResult<String> {
        image::guess_format(&stamp)
            .map_err(|_| AppError::configuration("Seal stamp is not a recognized image format"))?;
        let key = self.blobs.put(BlobCategory::Seal, stamp).await?;
        info!(key = %key, "Seal stamp image installed");
        self.stamp_ref = Some(key.clone());
        Ok(key)
    }

    /// Mint the seal of `file` within `tx`.
    ///
    /// `file` must already be `Effective` in the transaction. The seal takes
    /// `file.seal_id` as its id when set, so the document row can reference
    /// it before the seal row exists.
    pub async fn issue(
        &self,
        tx: &mut dyn StoreTransaction,
        file: &ProcessFile,
        issued_by: Uuid,
    ) -> AppResult<Seal> {
        if file.status != ProcessFileStatus::Effective {
            return Err(AppError::state(format!(
                "Seals are only issued to effective documents; {} is {}",
                file.id, file.status
            )));
        }
        if tx.find_seal_by_file(file.id).await?.is_some() {
            warn!(file_id = %file.id, "Seal already issued");
            return Err(AppError::conflict(
                ConflictReason::SealAlreadyIssued,
                format!("Process file {} already has a seal", file.id),
            ));
        }

        let approval_ids = tx
            .list_approvals(file.id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let now = Utc::now();
        let seal = Seal {
            id: file.seal_id.unwrap_or_else(Uuid::new_v4),
            file_id: file.id,
            seal_no: seal_number(&self.config.prefix, now, Uuid::new_v4()),
            seal_type: self.config.seal_type.clone(),
            content: self.config.content.clone(),
            image_ref: self.stamp_ref.clone(),
            approval_ids,
            issued_by,
            issued_at: now,
        };
        tx.insert_seal(&seal).await?;

        info!(file_id = %file.id, seal_no = %seal.seal_no, "Seal issued");
        Ok(seal)
    }

    /// The seal of a file.
    pub async fn find_by_file(&self, file_id: Uuid) -> AppResult<Seal> {
        self.store
            .find_seal_by_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Process file {file_id} has no seal")))
    }

    /// The stamp image of a file's seal.
    pub async fn image(&self, file_id: Uuid) -> AppResult<Bytes> {
        let seal = self.find_by_file(file_id).await?;
        let key = seal
            .image_ref
            .ok_or_else(|| AppError::not_found(format!("Seal {} has no image", seal.seal_no)))?;
        self.blobs.get(&key).await
    }
}

/// `{prefix}{yyyyMMddHHmmss}{8 hex}`; the suffix comes from a fresh UUID so
/// two seals minted in the same second still differ.
fn seal_number(prefix: &str, at: DateTime<Utc>, nonce: Uuid) -> String {
    let suffix = nonce.simple().to_string();
    format!(
        "{prefix}{}{}",
        at.format("%Y%m%d%H%M%S"),
        suffix[..8].to_uppercase()
    )
}
