// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Router wiring: routes, health report, CORS and the body limit

use super::support::{body_json, json_request, upload_request, TestApp};
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
};
use serde_json::json;
use std::sync::atomic::Ordering;
use textlab_server::api::RouterConfig;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_health_lists_all_models() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(
        json["models"],
        json!([
            { "name": "mock-t5", "task": "summarization" },
            { "name": "mock-bert-squad", "task": "question-answering" },
            { "name": "mock-minilm", "task": "sentence-embedding" }
        ])
    );
}

#[tokio::test]
async fn test_endpoints_reject_get() {
    let app = TestApp::new();

    for uri in ["/summarize/", "/qa/", "/search/"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "GET {}",
            uri
        );
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/translate/")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/search/")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:3000"))
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some(&HeaderValue::from_static("true"))
    );
}

#[tokio::test]
async fn test_cors_never_echoes_other_origins() {
    let app = TestApp::new();

    let mut request = json_request(
        "/search/",
        json!({ "query": "mammals", "documents": ["Dogs are mammals."] }),
    );
    request
        .headers_mut()
        .insert(header::ORIGIN, HeaderValue::from_static("http://evil.example"));
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("http://localhost:3000"))
    );
}

#[tokio::test]
async fn test_custom_cors_origin() {
    let app = TestApp::with_config(&RouterConfig {
        cors_origin: HeaderValue::from_static("https://lab.example.org"),
        ..RouterConfig::default()
    });

    let mut request = json_request(
        "/search/",
        json!({ "query": "mammals", "documents": ["Dogs are mammals."] }),
    );
    request.headers_mut().insert(
        header::ORIGIN,
        HeaderValue::from_static("https://lab.example.org"),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("https://lab.example.org"))
    );
}

#[tokio::test]
async fn test_oversized_json_body_is_rejected() {
    let app = TestApp::with_config(&RouterConfig {
        max_upload_bytes: 64,
        ..RouterConfig::default()
    });

    let documents: Vec<String> = (0..20).map(|i| format!("Document number {}", i)).collect();
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({ "query": "mammals", "documents": documents }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "payload_too_large");
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = TestApp::with_config(&RouterConfig {
        max_upload_bytes: 64,
        ..RouterConfig::default()
    });

    let document = "word ".repeat(200);
    let response = app
        .router
        .clone()
        .oneshot(upload_request("/summarize/", "file", document.as_bytes()))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}
