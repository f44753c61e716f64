//! # procfile-api
//!
//! HTTP API layer for the process-file service built on Axum.
//!
//! Provides the REST endpoints used by the presentation and export
//! collaborators, the actor-identity extractor, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
