//! Controlled seal entities.

pub mod model;

pub use model::Seal;
