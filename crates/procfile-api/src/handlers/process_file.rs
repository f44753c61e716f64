//! Process-file create, list, detail and lineage handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use procfile_entity::seal::Seal;
use procfile_entity::signature::Signature;

use crate::dto::request::{CreateProcessFileRequest, ProcessFileListQuery};
use crate::dto::response::{
    ApiResponse, PaginatedResponse, ProcessFileDetailView, ProcessFileView,
};
use crate::error::ApiError;
use crate::extractors::{AuthUser, PaginationParams};
use crate::state::AppState;

/// POST /api/process-files
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateProcessFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProcessFileView>>), ApiError> {
    let command = req.into_command()?;
    let file = state.services.registry.create(&auth, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(file.into()))))
}

/// GET /api/process-files?status=...&equipment_id=...&file_no=...
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<PaginationParams>,
    Query(query): Query<ProcessFileListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProcessFileView>>>, ApiError> {
    let filter = query.into_filter()?;
    let page = state
        .services
        .queries
        .list(&filter, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page.map(ProcessFileView::from).into())))
}

/// GET /api/process-files/pending
pub async fn pending(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProcessFileView>>>, ApiError> {
    let page = state
        .services
        .queries
        .list_pending(&auth, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page.map(ProcessFileView::from).into())))
}

/// GET /api/process-files/{id}
pub async fn get_detail(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProcessFileDetailView>>, ApiError> {
    let detail = state.services.queries.get_detail(id).await?;
    Ok(Json(ApiResponse::ok(detail.into())))
}

/// GET /api/process-files/{id}/lineage
pub async fn lineage(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ProcessFileView>>>, ApiError> {
    let versions = state.services.queries.lineage(id).await?;
    Ok(Json(ApiResponse::ok(
        versions.into_iter().map(ProcessFileView::from).collect(),
    )))
}

/// GET /api/process-files/{id}/signatures
pub async fn signatures(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Signature>>>, ApiError> {
    let signatures = state.services.queries.signatures(id).await?;
    Ok(Json(ApiResponse::ok(signatures)))
}

/// GET /api/process-files/{id}/seal
pub async fn seal(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Seal>>, ApiError> {
    let seal = state.services.queries.seal(id).await?;
    Ok(Json(ApiResponse::ok(seal)))
}

/// GET /api/equipment/{id}/process-files
pub async fn list_by_equipment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(equipment_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProcessFileView>>>, ApiError> {
    let page = state
        .services
        .queries
        .list_by_equipment(equipment_id, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page.map(ProcessFileView::from).into())))
}

/// GET /api/equipment/{id}/current
pub async fn current_for_equipment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(equipment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProcessFileView>>, ApiError> {
    let file = state
        .services
        .queries
        .current_for_equipment(equipment_id)
        .await?;
    Ok(Json(ApiResponse::ok(file.into())))
}
