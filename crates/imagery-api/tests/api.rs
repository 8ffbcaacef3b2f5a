//! Router tests over an in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use common::FakeProducer;
use imagery_api::{
    create_router, AppState, DataStore, HealthMonitor, HealthRegistry, Images, Producer,
    ServiceConfig, StoreHandle,
};
use imagery_control::{events, ImagePublished, ImageService, ImageUploaded};
use imagery_store::MemoryStore;

struct Harness {
    server: TestServer,
    uploaded: Arc<FakeProducer>,
    published: Arc<FakeProducer>,
    health: Arc<HealthRegistry>,
}

fn harness(publishing: bool) -> Harness {
    harness_with(ServiceConfig {
        publishing,
        ..ServiceConfig::default()
    })
}

fn harness_with(config: ServiceConfig) -> Harness {
    let store: Arc<dyn DataStore> = Arc::new(StoreHandle::new(MemoryStore::new()));
    let uploaded = Arc::new(FakeProducer::new());
    let published = Arc::new(FakeProducer::new());
    let uploaded_dyn: Arc<dyn Producer> = Arc::clone(&uploaded) as Arc<dyn Producer>;
    let published_dyn: Arc<dyn Producer> = Arc::clone(&published) as Arc<dyn Producer>;

    let images: Arc<Images> = Arc::new(ImageService::new(
        store,
        Some(uploaded_dyn),
        Some(published_dyn),
        config.control_config(),
    ));
    let health = Arc::new(HealthRegistry::new(
        Duration::from_secs(30),
        Duration::from_secs(90),
    ));
    let monitor: Arc<dyn HealthMonitor> = Arc::clone(&health) as Arc<dyn HealthMonitor>;

    let router = create_router(AppState::new(images, monitor, Arc::new(config)));
    Harness {
        server: TestServer::new(router).unwrap(),
        uploaded,
        published,
        health,
    }
}

async fn create_image(server: &TestServer, collection: &str, filename: &str) -> String {
    let response = server
        .post("/images")
        .json(&json!({ "collection_id": collection, "filename": filename }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["id"].as_str().unwrap().to_string()
}

async fn put_download_state(server: &TestServer, id: &str, variant: &str, state: &str) -> Value {
    let response = server
        .put(&format!("/images/{id}/downloads/{variant}"))
        .json(&json!({ "state": state }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK, "{variant} -> {state}");
    response.json::<Value>()
}

#[tokio::test]
async fn full_publish_flow() {
    let h = harness(true);
    let id = create_image(&h.server, "col-1", "chart.png").await;

    let response = h
        .server
        .put(&format!("/images/{id}"))
        .json(&json!({ "state": "uploaded", "upload": { "path": "uploads/chart.png" } }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let sent = h.uploaded.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    let uploaded: ImageUploaded = events::decode(&sent[0]).unwrap();
    assert_eq!(uploaded.path, "uploads/chart.png");

    let response = h
        .server
        .post(&format!("/images/{id}/downloads"))
        .json(&json!({ "variant": "original", "private": "private/chart.png", "type": "png" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["state"], "pending");

    put_download_state(&h.server, &id, "original", "importing").await;
    put_download_state(&h.server, &id, "original", "imported").await;

    let response = h.server.post(&format!("/images/{id}/publish")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["state"], "publishing");
    let sent = h.published.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    let published: ImagePublished = events::decode(&sent[0]).unwrap();
    assert_eq!(published.src_path, "private/chart.png");
    assert_eq!(published.dst_path, format!("images/{id}/original/chart.png"));

    let download = put_download_state(&h.server, &id, "original", "published").await;
    assert_eq!(download["public"], false);
    let download = put_download_state(&h.server, &id, "original", "completed").await;
    assert_eq!(download["public"], true);
    assert_eq!(
        download["href"],
        format!("http://localhost:9000/images/{id}/original/chart.png")
    );

    let image = h.server.get(&format!("/images/{id}")).await.json::<Value>();
    assert_eq!(image["state"], "published");
}

#[tokio::test]
async fn invalid_state_is_bad_request() {
    let h = harness(true);
    let id = create_image(&h.server, "col-1", "chart.png").await;

    let response = h
        .server
        .put(&format!("/images/{id}"))
        .json(&json!({ "state": "archived" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");
}

#[tokio::test]
async fn denied_transition_is_conflict() {
    let h = harness(true);
    let id = create_image(&h.server, "col-1", "chart.png").await;

    let response = h.server.post(&format!("/images/{id}/publish")).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert!(h.published.sent.lock().is_empty());
}

#[tokio::test]
async fn long_filename_is_bad_request() {
    let h = harness(true);
    let response = h
        .server
        .post("/images")
        .json(&json!({ "collection_id": "col-1", "filename": "a".repeat(41) }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_download_is_conflict() {
    let h = harness(true);
    let id = create_image(&h.server, "col-1", "chart.png").await;

    let body = json!({ "variant": "original" });
    let first = h
        .server
        .post(&format!("/images/{id}/downloads"))
        .json(&body)
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);

    let second = h
        .server
        .post(&format!("/images/{id}/downloads"))
        .json(&body)
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_image_is_not_found() {
    let h = harness(true);
    let response = h.server.get("/images/missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = h.server.get("/images/missing/downloads/original").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_collection() {
    let h = harness(true);
    create_image(&h.server, "col-1", "a.png").await;
    create_image(&h.server, "col-2", "b.png").await;

    let all = h.server.get("/images").await.json::<Vec<Value>>();
    assert_eq!(all.len(), 2);

    let col1 = h
        .server
        .get("/images?collection_id=col-1")
        .await
        .json::<Vec<Value>>();
    assert_eq!(col1.len(), 1);
    assert_eq!(col1[0]["collection_id"], "col-1");
}

#[tokio::test]
async fn web_instance_is_read_only() {
    let h = harness(false);

    let response = h
        .server
        .post("/images")
        .json(&json!({ "collection_id": "col-1", "filename": "chart.png" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);

    let listed = h.server.get("/images").await.json::<Vec<Value>>();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn health_reflects_registry() {
    let h = harness(true);

    let response = h.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json::<Value>()["status"], "WARNING");

    h.health.evaluate().await;
    let response = h.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "OK");
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let h = harness_with(ServiceConfig {
        cors_origins: vec![
            "http://localhost:3000".to_string(),
            "not a header\u{0}".to_string(),
        ],
        ..ServiceConfig::default()
    });

    let allowed = h
        .server
        .get("/images")
        .add_header(ORIGIN, HeaderValue::from_static("http://localhost:3000"))
        .await;
    assert_eq!(allowed.status_code(), StatusCode::OK);
    assert_eq!(
        allowed.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:3000"))
    );

    let other = h
        .server
        .get("/images")
        .add_header(ORIGIN, HeaderValue::from_static("http://evil.example"))
        .await;
    assert!(other.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
