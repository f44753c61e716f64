//! # procfile-service
//!
//! Business logic for process-file approval. The components build on each
//! other leaves first:
//!
//! - [`SignatureLedger`] appends signature records and stores their images.
//! - [`SealIssuer`] mints the one seal of an effective document.
//! - [`VersionRegistry`] assigns lineage and versions and owns the
//!   one-current-document-per-equipment rule.
//! - [`ApprovalStateMachine`] drives every status transition.
//!
//! Services follow constructor injection; all dependencies are provided at
//! construction time via `Arc` references.

pub mod approval;
pub mod container;
pub mod context;
pub mod ledger;
pub mod policy;
pub mod query;
pub mod registry;
pub mod seal;

pub use approval::{ApprovalStateMachine, Decision};
pub use container::ServiceContainer;
pub use context::RequestContext;
pub use ledger::SignatureLedger;
pub use policy::ApprovalPolicy;
pub use query::{DocumentDownload, ProcessFileQueryService};
pub use registry::{CreateProcessFile, DocumentUpload, VersionRegistry};
pub use seal::SealIssuer;
