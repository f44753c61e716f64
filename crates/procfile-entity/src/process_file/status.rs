//! Process-file status, approval levels and the transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of tiers in the approval chain.
pub const LAST_LEVEL: u8 = 3;

/// One tier of the approval chain, always within `1..=LAST_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ApprovalLevel(u8);

impl ApprovalLevel {
    /// The first tier.
    pub const FIRST: Self = Self(1);
    /// The final tier; approving it makes the document effective.
    pub const LAST: Self = Self(LAST_LEVEL);

    /// Build a level, returning `None` outside `1..=LAST_LEVEL`.
    pub fn new(level: u8) -> Option<Self> {
        (1..=LAST_LEVEL).contains(&level).then_some(Self(level))
    }

    /// Build a level from a database column value.
    pub fn from_i16(level: i16) -> Option<Self> {
        u8::try_from(level).ok().and_then(Self::new)
    }

    /// The raw level number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// The level as stored in `SMALLINT` columns.
    pub fn as_i16(self) -> i16 {
        i16::from(self.0)
    }

    /// Whether this is the final tier.
    pub fn is_last(self) -> bool {
        self.0 == LAST_LEVEL
    }

    /// The following tier, if any.
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Every tier in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=LAST_LEVEL).map(Self)
    }
}

impl TryFrom<u8> for ApprovalLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("approval level must be within 1..={LAST_LEVEL}"))
    }
}

impl From<ApprovalLevel> for u8 {
    fn from(level: ApprovalLevel) -> Self {
        level.0
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a process file.
///
/// `Rejected` and `Invalidated` are terminal. `Effective` is permanent
/// history except for the invalidate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "process_file_status")]
pub enum ProcessFileStatus {
    /// Being edited by its creator.
    #[sqlx(rename = "draft")]
    #[serde(rename = "draft")]
    Draft,
    /// Waiting for the first-tier decision.
    #[sqlx(rename = "pending_level1")]
    #[serde(rename = "pending_level1")]
    PendingLevel1,
    /// Waiting for the second-tier decision.
    #[sqlx(rename = "pending_level2")]
    #[serde(rename = "pending_level2")]
    PendingLevel2,
    /// Waiting for the final decision.
    #[sqlx(rename = "pending_level3")]
    #[serde(rename = "pending_level3")]
    PendingLevel3,
    /// Fully approved and sealed.
    #[sqlx(rename = "effective")]
    #[serde(rename = "effective")]
    Effective,
    /// Rejected at some level.
    #[sqlx(rename = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
    /// Retired after having been effective.
    #[sqlx(rename = "invalidated")]
    #[serde(rename = "invalidated")]
    Invalidated,
}

/// Actions that move a process file between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    /// Creator hands the draft over to the approval chain.
    Submit,
    /// Approver at the pending level accepts.
    Approve,
    /// Approver at the pending level refuses.
    Reject,
    /// An effective document is retired.
    Invalidate,
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Invalidate => "invalidate",
        };
        f.write_str(s)
    }
}

impl ProcessFileStatus {
    /// The status that waits for a decision at `level`.
    pub fn pending(level: ApprovalLevel) -> Self {
        match level.get() {
            1 => Self::PendingLevel1,
            2 => Self::PendingLevel2,
            _ => Self::PendingLevel3,
        }
    }

    /// The level this status waits for, if it is a pending status.
    pub fn pending_level(&self) -> Option<ApprovalLevel> {
        match self {
            Self::PendingLevel1 => ApprovalLevel::new(1),
            Self::PendingLevel2 => ApprovalLevel::new(2),
            Self::PendingLevel3 => ApprovalLevel::new(3),
            _ => None,
        }
    }

    /// Whether the document is still open for decision-making
    /// (`Draft` or any pending level). At most one per equipment.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::PendingLevel1 | Self::PendingLevel2 | Self::PendingLevel3
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Invalidated)
    }

    /// Apply `action`, returning the resulting status or `None` when the
    /// action is not allowed from this status.
    pub fn apply(self, action: TransitionAction) -> Option<Self> {
        match (self, action) {
            (Self::Draft, TransitionAction::Submit) => Some(Self::PendingLevel1),
            (status, TransitionAction::Approve) => {
                let level = status.pending_level()?;
                Some(match level.next() {
                    Some(next) => Self::pending(next),
                    None => Self::Effective,
                })
            }
            (status, TransitionAction::Reject) => {
                status.pending_level().map(|_| Self::Rejected)
            }
            (Self::Effective, TransitionAction::Invalidate) => Some(Self::Invalidated),
            _ => None,
        }
    }

    /// Legacy integer code used by the presentation collaborator.
    pub fn code(&self) -> i16 {
        match self {
            Self::Draft => 0,
            Self::PendingLevel1 => 1,
            Self::PendingLevel2 => 2,
            Self::PendingLevel3 => 3,
            Self::Effective => 5,
            Self::Rejected => -1,
            Self::Invalidated => -2,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Draft),
            1 => Some(Self::PendingLevel1),
            2 => Some(Self::PendingLevel2),
            3 => Some(Self::PendingLevel3),
            5 => Some(Self::Effective),
            -1 => Some(Self::Rejected),
            -2 => Some(Self::Invalidated),
            _ => None,
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingLevel1 => "pending_level1",
            Self::PendingLevel2 => "pending_level2",
            Self::PendingLevel3 => "pending_level3",
            Self::Effective => "effective",
            Self::Rejected => "rejected",
            Self::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for ProcessFileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProcessFileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_level1" => Ok(Self::PendingLevel1),
            "pending_level2" => Ok(Self::PendingLevel2),
            "pending_level3" => Ok(Self::PendingLevel3),
            "effective" => Ok(Self::Effective),
            "rejected" => Ok(Self::Rejected),
            "invalidated" => Ok(Self::Invalidated),
            other => other
                .parse::<i16>()
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| format!("unknown process file status: {other}")),
        }
    }
}
