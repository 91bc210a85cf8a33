// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /search/ tests against a keyword-driven encoder

use super::support::{body_json, json_request, TestApp};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use std::sync::atomic::Ordering;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_search_returns_closest_document() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({
                "query": "Which animals are mammals?",
                "documents": ["The sky is blue.", "Dogs are mammals."]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["document"], "Dogs are mammals.");
    let similarity = json["similarity"].as_f64().unwrap();
    assert!((similarity - 1.0).abs() < 1e-5, "similarity {}", similarity);
}

#[tokio::test]
async fn test_search_single_document_is_returned() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({ "query": "mammals", "documents": ["The sky is blue."] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["document"], "The sky is blue.");
    let similarity = json["similarity"].as_f64().unwrap();
    assert!((-1.0..=1.0).contains(&similarity));
}

#[tokio::test]
async fn test_search_tie_returns_first_document() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({
                "query": "sky",
                "documents": ["A clear sky.", "The sky at night.", "Cats are mammals."]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["document"], "A clear sky.");
}

#[tokio::test]
async fn test_search_empty_documents_is_400_without_encoding() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({ "query": "anything", "documents": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "No documents provided for search.");
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_missing_documents_is_rejected() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request("/search/", json!({ "query": "anything" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "invalid_request");
    assert!(json["detail"].as_str().unwrap().contains("documents"));
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_mistyped_documents_get_json_error() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({ "query": "anything", "documents": [1, 2] }),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "invalid_request");
    assert!(json["detail"].is_string());
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_search_malformed_json_gets_json_error() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/search/")
        .header("content-type", "application/json")
        .body(Body::from("{\"query\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_search_without_json_content_type_gets_json_error() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/search/")
        .body(Body::from(r#"{"query": "q", "documents": ["d"]}"#))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "unsupported_media_type");
}

#[tokio::test]
async fn test_search_encoder_failure_is_500() {
    let app = TestApp::failing();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "/search/",
            json!({ "query": "mammals", "documents": ["Dogs are mammals."] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error_type"], "inference_error");
}
