//! Mapping of `sqlx` failures into [`AppError`].

use procfile_core::error::{AppError, ConflictReason, ErrorKind};

/// Translate a `sqlx` error, turning violations of the schema's uniqueness
/// backstops into the conflict the service layer would have reported.
pub fn map_sqlx_error(context: &str, err: sqlx::Error) -> AppError {
    let constraint = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_owned);

    match constraint.as_deref().and_then(conflict_for_constraint) {
        Some(reason) => AppError::conflict(reason, format!("{context}: {}", describe(reason))),
        None => AppError::with_source(ErrorKind::Database, context.to_string(), err),
    }
}

fn conflict_for_constraint(constraint: &str) -> Option<ConflictReason> {
    match constraint {
        "uq_process_files_open" => Some(ConflictReason::OpenFileExists),
        "uq_process_files_current" => Some(ConflictReason::StatusChanged),
        "uq_process_files_file_no_version" => Some(ConflictReason::FileNoTaken),
        "uq_process_files_parent" => Some(ConflictReason::ParentSuperseded),
        "uq_seals_file" => Some(ConflictReason::SealAlreadyIssued),
        _ => None,
    }
}

fn describe(reason: ConflictReason) -> &'static str {
    match reason {
        ConflictReason::OpenFileExists => "equipment already has an open process file",
        ConflictReason::StatusChanged => "process file changed concurrently",
        ConflictReason::FileNoTaken => "file number already in use",
        ConflictReason::ParentSuperseded => "parent already has a newer revision",
        ConflictReason::SealAlreadyIssued => "seal already issued",
    }
}
