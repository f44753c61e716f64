//! Approval state machine: every status transition of a process file.
//!
//! Each transition reads a snapshot outside the transaction for the cheap
//! guards (state, role, input), then applies its writes in one transaction
//! that ends in a compare-and-swap on `status` + `row_version`. A racing
//! transition that committed first turns the swap into
//! `Conflict(StatusChanged)` and nothing of the loser is kept.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_database::store::{ProcessFileStore, StoreTransaction};
use procfile_entity::approval::{ApprovalRecord, ApprovalResult};
use procfile_entity::process_file::{
    ApprovalLevel, ProcessFile, ProcessFileStatus, TransitionAction,
};
use procfile_entity::signature::SignatureKind;

use crate::context::RequestContext;
use crate::ledger::SignatureLedger;
use crate::policy::ApprovalPolicy;
use crate::registry::VersionRegistry;
use crate::seal::SealIssuer;

/// One approver's decision at one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Level being decided; must match the document's pending level.
    pub level: u8,
    /// Approve or reject.
    pub result: ApprovalResult,
    /// Reviewer comment; mandatory on reject.
    pub opinion: Option<String>,
    /// Handwritten signature image.
    #[serde(skip)]
    pub signature_image: Bytes,
}

/// Drives submit, decide and invalidate.
#[derive(Debug, Clone)]
pub struct ApprovalStateMachine {
    store: Arc<dyn ProcessFileStore>,
    ledger: Arc<SignatureLedger>,
    seals: Arc<SealIssuer>,
    registry: Arc<VersionRegistry>,
    policy: Arc<ApprovalPolicy>,
}

impl ApprovalStateMachine {
    /// Creates a new approval state machine.
    pub fn new(
        store: Arc<dyn ProcessFileStore>,
        ledger: Arc<SignatureLedger>,
        seals: Arc<SealIssuer>,
        registry: Arc<VersionRegistry>,
        policy: Arc<ApprovalPolicy>,
    ) -> Self {
        Self {
            store,
            ledger,
            seals,
            registry,
            policy,
        }
    }

    /// Send a `Draft` into the chain at level 1, recording the submitter's
    /// signature.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        signature_image: Bytes,
    ) -> AppResult<ProcessFile> {
        let snapshot = self.find(file_id).await?;
        let next = snapshot
            .status
            .apply(TransitionAction::Submit)
            .ok_or_else(|| {
                AppError::state(format!(
                    "Only drafts can be submitted; {file_id} is {}",
                    snapshot.status
                ))
            })?;
        self.policy.require_submitter(ctx, &snapshot)?;
        if self
            .store
            .find_equipment(snapshot.equipment_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Equipment {} not found",
                snapshot.equipment_id
            )));
        }
        SignatureLedger::check_image(&signature_image)?;

        let mut tx = self.store.begin().await?;
        self.ledger
            .append(
                tx.as_mut(),
                ctx,
                file_id,
                SignatureKind::Submit,
                None,
                signature_image,
            )
            .await?;

        let now = Utc::now();
        let mut updated = snapshot.clone();
        updated.status = next;
        updated.submit_time = Some(now);
        updated.updated_at = now;
        let stored = self.swap(tx.as_mut(), &updated, &snapshot).await?;
        tx.commit().await?;

        self.log_transition(&snapshot, &stored, ctx);
        Ok(stored)
    }

    /// Record one approver's decision at the document's pending level.
    ///
    /// Approving the last level makes the document effective, mints its
    /// seal and promotes it to current, all in the same transaction.
    pub async fn decide(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        decision: Decision,
    ) -> AppResult<ProcessFile> {
        let level = ApprovalLevel::new(decision.level).ok_or_else(|| {
            AppError::validation(format!("Unknown approval level {}", decision.level))
        })?;
        let snapshot = self.find(file_id).await?;
        if snapshot.status != ProcessFileStatus::pending(level) {
            return Err(AppError::state(format!(
                "Process file {file_id} is {}, not awaiting level {level}",
                snapshot.status
            )));
        }
        self.policy.require_decider(ctx, level)?;

        let opinion = decision
            .opinion
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        if decision.result == ApprovalResult::Reject && opinion.is_none() {
            return Err(AppError::validation("An opinion is required to reject"));
        }
        SignatureLedger::check_image(&decision.signature_image)?;

        let action = match decision.result {
            ApprovalResult::Approve => TransitionAction::Approve,
            ApprovalResult::Reject => TransitionAction::Reject,
        };
        let next = snapshot.status.apply(action).ok_or_else(|| {
            AppError::state(format!(
                "Cannot {action} process file {file_id} in status {}",
                snapshot.status
            ))
        })?;

        let mut tx = self.store.begin().await?;
        let signature = self
            .ledger
            .append(
                tx.as_mut(),
                ctx,
                file_id,
                SignatureKind::Approve,
                Some(level),
                decision.signature_image,
            )
            .await?;

        let finalizing = next == ProcessFileStatus::Effective;
        if finalizing {
            tx.lock_equipment(snapshot.equipment_id).await?;
        }

        let now = Utc::now();
        let record = ApprovalRecord {
            id: Uuid::new_v4(),
            file_id,
            level: level.as_i16(),
            approver_id: ctx.actor_id,
            approver_role: ctx.role.clone(),
            result: decision.result,
            opinion,
            signature_id: signature.id,
            created_at: now,
        };
        tx.insert_approval(&record).await?;

        let mut updated = snapshot.clone();
        updated.status = next;
        updated.updated_at = now;
        if finalizing {
            updated.approval_time = Some(now);
            updated.effective_time = Some(now);
            updated.seal_id = Some(Uuid::new_v4());
        }
        let stored = self.swap(tx.as_mut(), &updated, &snapshot).await?;

        if finalizing {
            self.seals.issue(tx.as_mut(), &stored, ctx.actor_id).await?;
            self.registry.promote_to_current(tx.as_mut(), &stored).await?;
        }
        tx.commit().await?;

        let stored = if finalizing {
            self.find(file_id).await?
        } else {
            stored
        };
        self.log_transition(&snapshot, &stored, ctx);
        Ok(stored)
    }

    /// Retire an effective document.
    pub async fn invalidate(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<ProcessFile> {
        let snapshot = self.find(file_id).await?;
        if snapshot.status.apply(TransitionAction::Invalidate).is_none() {
            return Err(AppError::state(format!(
                "Only effective documents can be invalidated; {file_id} is {}",
                snapshot.status
            )));
        }
        self.policy.require_invalidator(ctx)?;
        self.registry.invalidate_current(ctx, file_id).await
    }

    async fn find(&self, file_id: Uuid) -> AppResult<ProcessFile> {
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Process file {file_id} not found")))
    }

    async fn swap(
        &self,
        tx: &mut dyn StoreTransaction,
        updated: &ProcessFile,
        snapshot: &ProcessFile,
    ) -> AppResult<ProcessFile> {
        tx.update_file_checked(updated, snapshot.status, snapshot.row_version)
            .await
            .inspect_err(|e| {
                if e.conflict_reason().is_some() {
                    warn!(
                        file_id = %snapshot.id,
                        expected = %snapshot.status,
                        "Transition lost a race: {}",
                        e.message
                    );
                }
            })
    }

    fn log_transition(&self, from: &ProcessFile, to: &ProcessFile, ctx: &RequestContext) {
        info!(
            file_id = %to.id,
            equipment_id = %to.equipment_id,
            actor_id = %ctx.actor_id,
            from = %from.status,
            to = %to.status,
            "Process file transition committed"
        );
    }
}
