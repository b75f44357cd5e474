//! End-to-end download flow against a mocked content source.
//!
//! Exercises the public surface — router, gateway, pipeline, production
//! client, and book builders — with wiremock standing in for the upstream
//! story API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wattpad_dl::api::create_router;
use wattpad_dl::{Config, StoryDownloader};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn story_json(server_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "12345",
        "title": "My Story!! 2024",
        "createDate": "2024-03-01T10:00:00Z",
        "modifyDate": "2024-04-01T10:00:00Z",
        "language": {"name": "English"},
        "user": {"username": "author1"},
        "description": "An end-to-end fixture.",
        "cover": format!("{server_uri}/img/cover-256-7.jpg"),
        "completed": false,
        "tags": ["test"],
        "mature": false,
        "url": format!("{server_uri}/story/12345"),
        "parts": [
            {"id": 100, "title": "Beginning"},
            {"id": 101, "title": "Middle"},
            {"id": 102, "title": "End"}
        ],
        "isPaywalled": false
    })
}

async fn app_for(server: &MockServer) -> axum::Router {
    let mut config = Config::default();
    config.source.api_base = server.uri();
    let config = Arc::new(config);
    let downloader = Arc::new(StoryDownloader::new((*config).clone()).unwrap());
    create_router(downloader, config)
}

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v3/stories/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(story_json(&server.uri())))
        .mount(server)
        .await;
    // Only the upscaled cover path is mocked: a standard-resolution request
    // would 404 and fail the whole flow
    Mock::given(method("GET"))
        .and(path("/img/cover-512-7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xD9]))
        .mount(server)
        .await;
    for (id, text) in [(100, "first"), (101, "second"), (102, "third")] {
        Mock::given(method("GET"))
            .and(path("/apiv2/"))
            .and(query_param("m", "storytext"))
            .and(query_param("id", id.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("<p>{text} part</p>")),
            )
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn full_story_download_produces_epub_attachment() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/12345?download_images=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/epub+zip")
    );
    // Exact slugification contract, images suffix included
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"my_story_2024_12345_images.epub\"")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn full_story_download_produces_pdf() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/12345?format=pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    // Chapter text makes it into the page streams, in order
    let first = bytes
        .windows(b"first part".len())
        .position(|w| w == b"first part")
        .unwrap();
    let third = bytes
        .windows(b"third part".len())
        .position(|w| w == b"third part")
        .unwrap();
    assert!(first < third);
}

#[tokio::test]
async fn upstream_domain_not_found_maps_to_404_fragment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/stories/404404"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error_code": 1017})),
        )
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/404404")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("does not exist"));
}

#[tokio::test]
async fn upstream_rate_limit_maps_to_429() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/stories/5"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn part_mode_resolves_owning_story() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/story_parts/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "groupId": 12345,
            "group": story_json(&server.uri()),
        })))
        .mount(&server)
        .await;
    mount_happy_path(&server).await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/100?mode=part")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Filename is derived from the resolved story id, not the part id
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"my_story_2024_12345.epub\"")
    );
}

#[tokio::test]
async fn authenticated_download_exchanges_credentials_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(204).insert_header("set-cookie", "token=abc; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_happy_path(&server).await;
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/12345?username=Reader&password=hunter2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_stop_with_403_before_metadata_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    // No story mock mounted: a metadata fetch would fail the test through
    // its 404-from-wiremock default, which maps differently than 403
    let app = app_for(&server).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/12345?username=reader&password=wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn identical_requests_stream_identical_artifacts() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let app = app_for(&server).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(
            axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap(),
        );
    }
    assert_eq!(bodies[0], bodies[1]);
}
