//! Binary downloads: original documents, seal stamps, signature images.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use uuid::Uuid;

use procfile_core::error::AppError;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/process-files/{id}/document
pub async fn document(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let download = state.services.queries.document(id).await?;
    let content_type = document_content_type(&download.name);
    binary_response(download.bytes, content_type, Some(&download.name))
}

/// GET /api/process-files/{id}/seal/image
pub async fn seal_image(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let bytes = state.services.queries.seal_image(id).await?;
    let content_type = image_content_type(&bytes);
    binary_response(bytes, content_type, None)
}

/// GET /api/signatures/{id}/image
pub async fn signature_image(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let bytes = state.services.queries.signature_image(id).await?;
    let content_type = image_content_type(&bytes);
    binary_response(bytes, content_type, None)
}

fn binary_response(
    data: Bytes,
    content_type: &str,
    filename: Option<&str>,
) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len());
    if let Some(name) = filename {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name.replace('"', "")),
        );
    }
    builder
        .body(Body::from(data))
        .map_err(|e| ApiError(AppError::internal(format!("Response build failed: {e}"))))
}

fn image_content_type(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

fn document_content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}
