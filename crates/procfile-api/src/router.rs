//! Route definitions for the process-file HTTP API.
//!
//! All routes are mounted under `/api`. Path parameters use Axum 0.8's
//! `{name}` syntax.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route, threading `AppState` through
/// `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(process_file_routes())
        .merge(approval_routes())
        .merge(binary_routes())
        .merge(equipment_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Create, list, detail, lineage, history
fn process_file_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/process-files",
            get(handlers::process_file::list).post(handlers::process_file::create),
        )
        .route("/process-files/pending", get(handlers::process_file::pending))
        .route("/process-files/{id}", get(handlers::process_file::get_detail))
        .route(
            "/process-files/{id}/lineage",
            get(handlers::process_file::lineage),
        )
        .route(
            "/process-files/{id}/signatures",
            get(handlers::process_file::signatures),
        )
        .route("/process-files/{id}/seal", get(handlers::process_file::seal))
}

/// Status transitions
fn approval_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/process-files/{id}/submit",
            post(handlers::approval::submit),
        )
        .route(
            "/process-files/{id}/decisions",
            post(handlers::approval::decide),
        )
        .route(
            "/process-files/{id}/invalidate",
            post(handlers::approval::invalidate),
        )
}

/// Documents and images
fn binary_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/process-files/{id}/document",
            get(handlers::binary::document),
        )
        .route(
            "/process-files/{id}/seal/image",
            get(handlers::binary::seal_image),
        )
        .route(
            "/signatures/{id}/image",
            get(handlers::binary::signature_image),
        )
}

/// Per-equipment views
fn equipment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/equipment/{id}/process-files",
            get(handlers::process_file::list_by_equipment),
        )
        .route(
            "/equipment/{id}/current",
            get(handlers::process_file::current_for_equipment),
        )
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
