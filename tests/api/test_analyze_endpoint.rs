// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::*;
use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use medical_classifier::{
    config::ServiceConfig,
    firebase::StorageError,
    vision::image_utils::MAX_IMAGE_SIZE,
};
use serde_json::json;

#[tokio::test]
async fn test_analyze_requires_login() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(32, 32));

    let (status, json) = send(ctx.app(), multipart_request(None, body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error_type"], "unauthorized");
    assert_eq!(ctx.storage.object_count().await, 0);
    assert!(ctx.records.is_empty().await);
}

#[tokio::test]
async fn test_analyze_rejects_unknown_token() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(32, 32));

    let (status, _) = send(ctx.app(), multipart_request(Some("not-a-session"), body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_analyze_multipart_persists_image_and_record() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    let body = multipart_body("image", "Chest Scan 1.png", "image/png", &png_bytes(48, 40));

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["label"], "PNEUMONIA");
    assert!((json["confidence"].as_f64().unwrap() - 0.92).abs() < 1e-6);
    assert_eq!(json["width"], 48);
    assert_eq!(json["height"], 40);
    assert_eq!(json["model"], "fixed-classifier");
    assert_eq!(json["persisted"], true);

    let paths = ctx.storage.paths().await;
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("xray_images/"));
    assert!(paths[0].ends_with("_Chest_Scan_1.png"));
    assert_eq!(json["objectPath"], paths[0].as_str());
    assert_eq!(
        ctx.storage.content_type(&paths[0]).await.as_deref(),
        Some("image/png")
    );

    let records = ctx.records.all().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.file_name, "Chest_Scan_1.png");
    assert_eq!(json["imageUrl"], record.image_url.as_str());
    assert_eq!(json["recordId"], record.id.as_deref().unwrap());
    assert_eq!(record.user_email.as_deref(), Some(TEST_EMAIL));
}

#[tokio::test]
async fn test_analyze_json_base64() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    let image = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(16, 16)));

    let (status, json) = send(
        ctx.app(),
        json_request(
            Method::POST,
            "/v1/analyze",
            Some(&token),
            json!({ "image": image, "fileName": "frontal.png" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["fileName"], "frontal.png");
    assert_eq!(ctx.records.len().await, 1);
}

#[tokio::test]
async fn test_analyze_invalid_image_writes_nothing() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    let body = multipart_body("image", "notes.txt", "text/plain", b"definitely not an image");

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", json);
    assert_eq!(ctx.storage.object_count().await, 0);
    assert!(ctx.records.is_empty().await);
}

#[tokio::test]
async fn test_analyze_missing_image_field() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    let body = multipart_body("file", "chest.png", "image/png", &png_bytes(16, 16));

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "image");
}

#[tokio::test]
async fn test_analyze_without_classifier() {
    let ctx = context(ServiceConfig::default(), None).await;
    let token = login(&ctx).await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(16, 16));

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error_type"], "service_unavailable");
}

#[tokio::test]
async fn test_analyze_without_persistence() {
    let settings = ServiceConfig {
        persist_predictions: false,
        ..ServiceConfig::default()
    };
    let ctx = context(settings, pneumonia()).await;
    let token = login(&ctx).await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(16, 16));

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["persisted"], false);
    assert!(json.get("imageUrl").is_none());
    assert_eq!(ctx.storage.object_count().await, 0);
    assert!(ctx.records.is_empty().await);
}

#[tokio::test]
async fn test_analyze_open_access() {
    let settings = ServiceConfig {
        require_login: false,
        ..ServiceConfig::default()
    };
    let ctx = context(settings, pneumonia()).await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(16, 16));

    let (status, _) = send(ctx.app(), multipart_request(None, body)).await;

    assert_eq!(status, StatusCode::OK);
    let records = ctx.records.all().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].user_email.is_none());
}

#[tokio::test]
async fn test_analyze_storage_failure_skips_record() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    ctx.storage
        .inject_error(StorageError::NetworkError("bucket unreachable".into()))
        .await;
    let body = multipart_body("image", "chest.png", "image/png", &png_bytes(16, 16));

    let (status, json) = send(ctx.app(), multipart_request(Some(&token), body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error_type"], "upstream_error");
    assert!(ctx.records.is_empty().await);
}

#[tokio::test]
async fn test_analyze_oversized_image() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;

    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.resize(MAX_IMAGE_SIZE + 1, 0);

    let (status, json) = send(
        ctx.app(),
        json_request(
            Method::POST,
            "/v1/analyze",
            Some(&token),
            json!({ "image": STANDARD.encode(&data), "fileName": "huge.png" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "body: {}", json);
    assert_eq!(ctx.storage.object_count().await, 0);
}
