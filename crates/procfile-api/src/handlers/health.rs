//! Health check handler.

use axum::Json;
use axum::extract::State;

use procfile_core::traits::blob::BlobStore;
use procfile_database::store::ProcessFileStore;

use crate::dto::response::{ApiResponse, ComponentHealth, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let store = &state.services.store;
    let blobs = &state.services.blobs;
    let store_ok = store.health_check().await.unwrap_or(false);
    let blobs_ok = blobs.health_check().await.unwrap_or(false);

    Json(ApiResponse::ok(HealthResponse {
        status: if store_ok && blobs_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: ComponentHealth {
            backend: store.backend().to_string(),
            healthy: store_ok,
        },
        blobs: ComponentHealth {
            backend: blobs.provider_type().to_string(),
            healthy: blobs_ok,
        },
    }))
}
