//! Wires every service from configuration and the two backends.

use std::sync::Arc;

use tracing::info;

use procfile_core::config::AppConfig;
use procfile_core::result::AppResult;
use procfile_core::traits::blob::BlobStore;
use procfile_database::store::ProcessFileStore;

use crate::approval::ApprovalStateMachine;
use crate::ledger::SignatureLedger;
use crate::policy::ApprovalPolicy;
use crate::query::ProcessFileQueryService;
use crate::registry::VersionRegistry;
use crate::seal::SealIssuer;

/// All services, built once at startup and shared by handlers.
#[derive(Debug, Clone)]
pub struct ServiceContainer {
    /// Committed-state store.
    pub store: Arc<dyn ProcessFileStore>,
    /// Blob store for signatures, seals and documents.
    pub blobs: Arc<dyn BlobStore>,
    /// Role-to-level mapping.
    pub policy: Arc<ApprovalPolicy>,
    /// Signature ledger.
    pub ledger: Arc<SignatureLedger>,
    /// Seal issuer.
    pub seals: Arc<SealIssuer>,
    /// Version registry.
    pub registry: Arc<VersionRegistry>,
    /// Approval state machine.
    pub approvals: Arc<ApprovalStateMachine>,
    /// Read-side queries.
    pub queries: Arc<ProcessFileQueryService>,
}

impl ServiceContainer {
    /// Build the services. Fails on an invalid approval mapping or an
    /// unreadable seal stamp image.
    pub async fn build(
        config: &AppConfig,
        store: Arc<dyn ProcessFileStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> AppResult<Self> {
        let policy = Arc::new(ApprovalPolicy::from_config(&config.approval)?);
        let ledger = Arc::new(SignatureLedger::new(Arc::clone(&store), Arc::clone(&blobs)));
        let seals = Arc::new(
            SealIssuer::initialize(Arc::clone(&store), Arc::clone(&blobs), config.seal.clone())
                .await?,
        );
        let registry = Arc::new(VersionRegistry::new(
            Arc::clone(&store),
            Arc::clone(&blobs),
            config.storage.clone(),
            config.file_no.clone(),
        ));
        let approvals = Arc::new(ApprovalStateMachine::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&seals),
            Arc::clone(&registry),
            Arc::clone(&policy),
        ));
        let queries = Arc::new(ProcessFileQueryService::new(
            Arc::clone(&store),
            Arc::clone(&blobs),
            Arc::clone(&ledger),
            Arc::clone(&seals),
            Arc::clone(&policy),
        ));

        info!(
            store = store.backend(),
            blobs = blobs.provider_type(),
            "Services initialized"
        );
        Ok(Self {
            store,
            blobs,
            policy,
            ledger,
            seals,
            registry,
            approvals,
            queries,
        })
    }
}
