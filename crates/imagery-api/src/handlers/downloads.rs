//! Download variant endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use imagery_control::{Download, DownloadUpdate, ImageId, NewDownload};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a download.
#[derive(Debug, Deserialize)]
pub struct CreateDownloadRequest {
    /// Variant name, e.g. `original` or `png_bw`.
    pub variant: String,
    /// Initial download fields.
    #[serde(flatten)]
    pub download: NewDownload,
}

/// List the downloads of an image.
///
/// `GET /images/:image_id/downloads`
///
/// # Errors
///
/// Returns 404 if the image does not exist.
pub async fn list_downloads(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<BTreeMap<String, Download>>, ApiError> {
    let downloads = state.images.list_downloads(&ImageId::new(image_id))?;
    Ok(Json(downloads))
}

/// Register a download variant.
///
/// `POST /images/:image_id/downloads`
///
/// # Errors
///
/// Returns 409 if the variant already exists.
pub async fn create_download(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(request): Json<CreateDownloadRequest>,
) -> Result<(StatusCode, Json<Download>), ApiError> {
    let download = state.images.create_download(
        &ImageId::new(image_id),
        &request.variant,
        request.download,
    )?;
    Ok((StatusCode::CREATED, Json(download)))
}

/// Get a download variant.
///
/// `GET /images/:image_id/downloads/:variant`
///
/// # Errors
///
/// Returns 404 if the image or variant does not exist.
pub async fn get_download(
    State(state): State<AppState>,
    Path((image_id, variant)): Path<(String, String)>,
) -> Result<Json<Download>, ApiError> {
    let download = state
        .images
        .get_download(&ImageId::new(image_id), &variant)?;
    Ok(Json(download))
}

/// Update a download variant.
///
/// `PUT /images/:image_id/downloads/:variant`
///
/// # Errors
///
/// Returns 400 for invalid input and 409 if the state change is not allowed.
pub async fn update_download(
    State(state): State<AppState>,
    Path((image_id, variant)): Path<(String, String)>,
    Json(update): Json<DownloadUpdate>,
) -> Result<Json<Download>, ApiError> {
    let download = state
        .images
        .update_download(&ImageId::new(image_id), &variant, update)?;
    Ok(Json(download))
}
