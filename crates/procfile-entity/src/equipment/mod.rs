//! Equipment catalog entities.

pub mod model;

pub use model::Equipment;
