//! Process-file domain entities.

pub mod detail;
pub mod model;
pub mod query;
pub mod status;

pub use detail::ProcessFileDetail;
pub use model::ProcessFile;
pub use query::ProcessFileFilter;
pub use status::{ApprovalLevel, LAST_LEVEL, ProcessFileStatus, TransitionAction};
