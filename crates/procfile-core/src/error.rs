//! Unified application error types for the process-file service.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A mandatory field is missing or malformed.
    Validation,
    /// A concurrent change or uniqueness rule prevented the operation.
    Conflict,
    /// The action is not permitted from the document's current state.
    State,
    /// The requested resource was not found.
    NotFound,
    /// The actor's role does not permit the action.
    Authorization,
    /// No usable actor identity was supplied.
    Authentication,
    /// A database error occurred.
    Database,
    /// A blob storage I/O error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::State => write!(f, "STATE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The specific rule behind a [`ErrorKind::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConflictReason {
    /// The equipment already has a document in `Draft` or a pending level.
    OpenFileExists,
    /// The document's status changed after the caller read it.
    StatusChanged,
    /// A seal was already minted for the document.
    SealAlreadyIssued,
    /// The parent already has a newer revision.
    ParentSuperseded,
    /// The file number is already used by another lineage.
    FileNoTaken,
}

impl ConflictReason {
    /// Return the stable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenFileExists => "OpenFileExists",
            Self::StatusChanged => "StatusChanged",
            Self::SealAlreadyIssued => "SealAlreadyIssued",
            Self::ParentSuperseded => "ParentSuperseded",
            Self::FileNoTaken => "FileNoTaken",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified application error used throughout the workspace.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Set for conflicts only.
    pub conflict: Option<ConflictReason>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            conflict: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            conflict: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error tagged with the rule that was violated.
    pub fn conflict(reason: ConflictReason, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Conflict,
            message: message.into(),
            conflict: Some(reason),
            source: None,
        }
    }

    /// Create a state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller can fix the input or refresh and retry.
    ///
    /// State, not-found and authorization errors are terminal for the
    /// request and are shown to the operator as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation | ErrorKind::Conflict)
    }

    /// Return the conflict reason, if this is a conflict.
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        self.conflict
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            conflict: self.conflict,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(AppError::validation("x").is_recoverable());
        assert!(AppError::conflict(ConflictReason::StatusChanged, "x").is_recoverable());
        assert!(!AppError::state("x").is_recoverable());
        assert!(!AppError::not_found("x").is_recoverable());
        assert!(!AppError::authorization("x").is_recoverable());
    }

    #[test]
    fn test_conflict_reason_survives_clone() {
        let err = AppError::conflict(ConflictReason::SealAlreadyIssued, "seal exists");
        let cloned = err.clone();
        assert_eq!(cloned.conflict_reason(), Some(ConflictReason::SealAlreadyIssued));
        assert_eq!(cloned.to_string(), "CONFLICT: seal exists");
    }
}
