//! Role-to-level mapping and the other authorization rules of the chain.

use std::collections::BTreeMap;

use tracing::warn;

use procfile_core::config::ApprovalConfig;
use procfile_core::error::AppError;
use procfile_core::result::AppResult;
use procfile_entity::process_file::{ApprovalLevel, LAST_LEVEL, ProcessFile, ProcessFileStatus};

use crate::context::RequestContext;

/// Validated approval configuration.
#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    roles: BTreeMap<ApprovalLevel, String>,
    creator_only_submit: bool,
    invalidate_roles: Vec<String>,
}

impl ApprovalPolicy {
    /// Build the policy, failing with a configuration error when the
    /// mapping does not cover every level exactly once.
    pub fn from_config(config: &ApprovalConfig) -> AppResult<Self> {
        config.validate(LAST_LEVEL)?;
        let roles = config
            .levels
            .iter()
            .filter_map(|l| ApprovalLevel::new(l.level).map(|level| (level, l.role.trim().to_string())))
            .collect();
        Ok(Self {
            roles,
            creator_only_submit: config.creator_only_submit,
            invalidate_roles: config.invalidate_roles.clone(),
        })
    }

    /// Role allowed to decide at `level`.
    pub fn role_for(&self, level: ApprovalLevel) -> &str {
        self.roles.get(&level).map(String::as_str).unwrap_or_default()
    }

    /// Levels `role` may decide, in order.
    pub fn levels_for_role(&self, role: &str) -> Vec<ApprovalLevel> {
        self.roles
            .iter()
            .filter(|(_, r)| r.eq_ignore_ascii_case(role.trim()))
            .map(|(level, _)| *level)
            .collect()
    }

    /// Pending statuses `role` is expected to act on.
    pub fn pending_statuses_for_role(&self, role: &str) -> Vec<ProcessFileStatus> {
        self.levels_for_role(role)
            .into_iter()
            .map(ProcessFileStatus::pending)
            .collect()
    }

    /// Fail unless the actor's role is mapped to `level`.
    pub fn require_decider(&self, ctx: &RequestContext, level: ApprovalLevel) -> AppResult<()> {
        let required = self.role_for(level);
        if ctx.has_role(required) {
            return Ok(());
        }
        warn!(
            actor_id = %ctx.actor_id,
            role = %ctx.role,
            level = level.get(),
            required,
            "Approval denied: role mismatch"
        );
        Err(AppError::authorization(format!(
            "Level {level} must be decided by role {required}, not {}",
            ctx.role
        )))
    }

    /// Fail unless the actor may submit `file`.
    pub fn require_submitter(&self, ctx: &RequestContext, file: &ProcessFile) -> AppResult<()> {
        if !self.creator_only_submit || ctx.actor_id == file.creator_id {
            return Ok(());
        }
        warn!(
            actor_id = %ctx.actor_id,
            file_id = %file.id,
            "Submit denied: actor is not the creator"
        );
        Err(AppError::authorization(
            "Only the creator of a process file may submit it",
        ))
    }

    /// Fail unless the actor may invalidate effective documents.
    pub fn require_invalidator(&self, ctx: &RequestContext) -> AppResult<()> {
        if self.invalidate_roles.is_empty() || self.invalidate_roles.iter().any(|r| ctx.has_role(r))
        {
            return Ok(());
        }
        warn!(actor_id = %ctx.actor_id, role = %ctx.role, "Invalidate denied");
        Err(AppError::authorization(format!(
            "Role {} may not invalidate process files",
            ctx.role
        )))
    }
}
