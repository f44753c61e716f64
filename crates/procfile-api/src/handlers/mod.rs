//! Route handlers organized by domain.

pub mod approval;
pub mod binary;
pub mod health;
pub mod process_file;
