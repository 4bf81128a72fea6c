//! Conversion routes.

use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::info;

use super::{FileRequest, FileResponse, MergeRequest, OfficeRequest};
use crate::helpers::RouteResult;
use crate::state::AppState;

/// Merge PDFs into one, pages in request order.
pub async fn merge_pdfs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> RouteResult<Json<FileResponse>> {
    info!("Merging {} documents", request.files.len());
    let file_base64 = state.converter.merge_pdfs(&request.files).await?;
    Ok(Json(FileResponse { file_base64 }))
}

/// Convert an office document with the headless office suite.
pub async fn office_to_pdf(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OfficeRequest>,
) -> RouteResult<Json<FileResponse>> {
    info!(
        "Converting office document ({})",
        request.extension.as_deref().unwrap_or("docx")
    );
    let file_base64 = state
        .converter
        .office_to_pdf(&request.file_base64, request.extension.as_deref())
        .await?;
    Ok(Json(FileResponse { file_base64 }))
}

pub async fn image_to_pdf(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FileRequest>,
) -> RouteResult<Json<FileResponse>> {
    let file_base64 = state.converter.image_to_pdf(&request.file_base64).await?;
    Ok(Json(FileResponse { file_base64 }))
}

pub async fn html_to_pdf(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FileRequest>,
) -> RouteResult<Json<FileResponse>> {
    let file_base64 = state.converter.html_to_pdf(&request.file_base64).await?;
    Ok(Json(FileResponse { file_base64 }))
}
