// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::*;
use axum::{body::Body, http::{header, Request, StatusCode}};
use medical_classifier::config::ServiceConfig;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_index_page() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;

    let response = ctx
        .app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Chest X-ray Classifier"));
    assert!(html.contains(r#"data-required="true""#));
}

#[tokio::test]
async fn test_health_with_classifier() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;

    let (status, json) = send(ctx.app(), get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["classifierLoaded"], true);
    assert_eq!(json["backend"], "mock");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["build"], medical_classifier::version::VERSION);
    assert!(json["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "chest-xray-classification"));
    assert!(json.get("issues").is_none());
}

#[tokio::test]
async fn test_health_degraded_without_classifier() {
    let ctx = context(ServiceConfig::default(), None).await;

    let (status, json) = send(ctx.app(), get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["issues"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_models_listing() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;

    let (status, json) = send(ctx.app(), get_request("/v1/models", None)).await;

    assert_eq!(status, StatusCode::OK);
    let model = &json["models"][0];
    assert_eq!(model["name"], "fixed-classifier");
    assert_eq!(model["available"], true);
    assert_eq!(model["modelType"], "image-classification");
    assert_eq!(model["labels"][1], "PNEUMONIA");
}
