//! Submit, decide and invalidate handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::dto::request::{DecisionRequest, SubmitRequest};
use crate::dto::response::{ApiResponse, ProcessFileView};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/process-files/{id}/submit
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<ApiResponse<ProcessFileView>>, ApiError> {
    let signature = req.into_signature()?;
    let file = state.services.approvals.submit(&auth, id, signature).await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// POST /api/process-files/{id}/decisions
pub async fn decide(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<ProcessFileView>>, ApiError> {
    let decision = req.into_decision()?;
    let file = state.services.approvals.decide(&auth, id, decision).await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// POST /api/process-files/{id}/invalidate
pub async fn invalidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProcessFileView>>, ApiError> {
    let file = state.services.approvals.invalidate(&auth, id).await?;
    Ok(Json(ApiResponse::ok(file.into())))
}
