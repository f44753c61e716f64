//! Approval chain, file-number and seal configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One tier of the approval chain and the role allowed to decide it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRoleConfig {
    /// Level number, 1-based.
    pub level: u8,
    /// Role string supplied by the identity collaborator.
    pub role: String,
    /// Human-readable title of the tier.
    #[serde(default)]
    pub title: String,
}

/// Approval chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Role-to-level mapping.
    #[serde(default = "default_levels")]
    pub levels: Vec<LevelRoleConfig>,
    /// Only the document's creator may submit it.
    #[serde(default = "default_creator_only_submit")]
    pub creator_only_submit: bool,
    /// Roles allowed to invalidate an effective document. Empty means any
    /// authenticated actor.
    #[serde(default)]
    pub invalidate_roles: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            creator_only_submit: default_creator_only_submit(),
            invalidate_roles: Vec::new(),
        }
    }
}

impl ApprovalConfig {
    /// Check that every level `1..=last_level` is mapped exactly once to a
    /// non-empty role and that no other level is mapped.
    pub fn validate(&self, last_level: u8) -> Result<(), AppError> {
        for level in 1..=last_level {
            let mapped: Vec<&LevelRoleConfig> =
                self.levels.iter().filter(|l| l.level == level).collect();
            match mapped.as_slice() {
                [] => {
                    return Err(AppError::configuration(format!(
                        "approval level {level} has no role mapping"
                    )));
                }
                [one] if one.role.trim().is_empty() => {
                    return Err(AppError::configuration(format!(
                        "approval level {level} is mapped to an empty role"
                    )));
                }
                [_] => {}
                _ => {
                    return Err(AppError::configuration(format!(
                        "approval level {level} is mapped more than once"
                    )));
                }
            }
        }
        if let Some(extra) = self
            .levels
            .iter()
            .find(|l| l.level == 0 || l.level > last_level)
        {
            return Err(AppError::configuration(format!(
                "approval level {} is outside 1..={last_level}",
                extra.level
            )));
        }
        Ok(())
    }
}

/// Generated file-number settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNoConfig {
    /// Prefix placed before the `yyyyMMdd` date and sequence.
    #[serde(default = "default_file_no_prefix")]
    pub prefix: String,
}

impl Default for FileNoConfig {
    fn default() -> Self {
        Self {
            prefix: default_file_no_prefix(),
        }
    }
}

/// Seal issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealConfig {
    /// Prefix of every seal number.
    #[serde(default = "default_seal_prefix")]
    pub prefix: String,
    /// Seal type label recorded on each seal.
    #[serde(default = "default_seal_type")]
    pub seal_type: String,
    /// Stamp text recorded on each seal.
    #[serde(default = "default_seal_content")]
    pub content: String,
    /// Optional stamp image loaded into the blob store at startup.
    #[serde(default)]
    pub image_path: Option<String>,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            prefix: default_seal_prefix(),
            seal_type: default_seal_type(),
            content: default_seal_content(),
            image_path: None,
        }
    }
}

fn default_levels() -> Vec<LevelRoleConfig> {
    vec![
        LevelRoleConfig {
            level: 1,
            role: "WORKSHOP_DIRECTOR".to_string(),
            title: "Workshop director review".to_string(),
        },
        LevelRoleConfig {
            level: 2,
            role: "PRODUCTION_TECH_MANAGER".to_string(),
            title: "Production technology manager review".to_string(),
        },
        LevelRoleConfig {
            level: 3,
            role: "INJECTION_MANAGER".to_string(),
            title: "Injection department manager review".to_string(),
        },
    ]
}

fn default_creator_only_submit() -> bool {
    true
}

fn default_file_no_prefix() -> String {
    "PF".to_string()
}

fn default_seal_prefix() -> String {
    "SEAL".to_string()
}

fn default_seal_type() -> String {
    "PROCESS_CONTROLLED".to_string()
}

fn default_seal_content() -> String {
    "Controlled process document".to_string()
}
