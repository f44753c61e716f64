//! Electronic signature entities.

pub mod model;

pub use model::{Signature, SignatureKind};
