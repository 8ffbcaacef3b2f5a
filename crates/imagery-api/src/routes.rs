//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{downloads, health, images};
use crate::state::AppState;

/// Create the router with all routes and middleware.
///
/// # Routes
///
/// ## Always
/// - `GET /health` - Health report
/// - `GET /images` - List images (`?collection_id=` filters)
/// - `GET /images/:image_id` - Get image
/// - `GET /images/:image_id/downloads` - List downloads
/// - `GET /images/:image_id/downloads/:variant` - Get download
///
/// ## Publishing instances only
/// - `POST /images` - Create image
/// - `PUT /images/:image_id` - Update image
/// - `POST /images/:image_id/publish` - Publish image
/// - `POST /images/:image_id/downloads` - Register download
/// - `PUT /images/:image_id/downloads/:variant` - Update download
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let config = Arc::clone(&state.config);
    let cors = build_cors_layer(&config.cors_origins);

    let router = if config.publishing {
        Router::new()
            .route(
                "/images",
                get(images::list_images).post(images::create_image),
            )
            .route(
                "/images/:image_id",
                get(images::get_image).put(images::update_image),
            )
            .route("/images/:image_id/publish", post(images::publish_image))
            .route(
                "/images/:image_id/downloads",
                get(downloads::list_downloads).post(downloads::create_download),
            )
            .route(
                "/images/:image_id/downloads/:variant",
                get(downloads::get_download).put(downloads::update_download),
            )
    } else {
        Router::new()
            .route("/images", get(images::list_images))
            .route("/images/:image_id", get(images::get_image))
            .route(
                "/images/:image_id/downloads",
                get(downloads::list_downloads),
            )
            .route(
                "/images/:image_id/downloads/:variant",
                get(downloads::get_download),
            )
    };

    router
        .route("/health", get(health::health))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
