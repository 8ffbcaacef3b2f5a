//! Image endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use imagery_control::{CollectionId, Image, ImageId, ImageUpdate, NewImage};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for listing images.
#[derive(Debug, Default, Deserialize)]
pub struct ListImagesQuery {
    /// Only list images in this collection.
    pub collection_id: Option<String>,
}

/// List images.
///
/// `GET /images?collection_id=...`
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let collection_id = query
        .collection_id
        .filter(|c| !c.is_empty())
        .map(CollectionId::new);
    let images = state.images.list_images(collection_id.as_ref())?;
    Ok(Json(images))
}

/// Create an image.
///
/// `POST /images`
///
/// # Errors
///
/// Returns 400 if the request is invalid.
pub async fn create_image(
    State(state): State<AppState>,
    Json(request): Json<NewImage>,
) -> Result<(StatusCode, Json<Image>), ApiError> {
    let image = state.images.create_image(request)?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// Get an image.
///
/// `GET /images/:image_id`
///
/// # Errors
///
/// Returns 404 if the image does not exist (or is not published on web instances).
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<Image>, ApiError> {
    let image = state.images.get_image(&ImageId::new(image_id))?;
    Ok(Json(image))
}

/// Update an image.
///
/// `PUT /images/:image_id`
///
/// # Errors
///
/// Returns 400 for invalid input and 409 if the state change is not allowed.
pub async fn update_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(update): Json<ImageUpdate>,
) -> Result<Json<Image>, ApiError> {
    let image = state
        .images
        .update_image(&ImageId::new(image_id), update)
        .await?;
    Ok(Json(image))
}

/// Publish an image.
///
/// `POST /images/:image_id/publish`
///
/// # Errors
///
/// Returns 409 if the image is not ready to publish.
pub async fn publish_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<Image>, ApiError> {
    let image = state.images.publish_image(&ImageId::new(image_id)).await?;
    Ok(Json(image))
}
