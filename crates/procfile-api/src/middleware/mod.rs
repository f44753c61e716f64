//! Tower layers applied around the router.

pub mod cors;

pub use cors::build_cors_layer;
