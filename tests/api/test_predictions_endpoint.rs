// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::*;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use medical_classifier::{
    config::ServiceConfig,
    firebase::RecordStore,
    records::{Label, PredictionRecord},
};

async fn seed(ctx: &TestContext) {
    let now = Utc::now();
    for (i, (name, label)) in [
        ("first.png", Label::Normal),
        ("second.png", Label::Pneumonia),
        ("third.png", Label::Normal),
    ]
    .into_iter()
    .enumerate()
    {
        let record = PredictionRecord::new(
            name,
            label,
            0.8,
            now - Duration::minutes(10 - i as i64),
            format!("https://storage.googleapis.com/test-bucket/xray_images/{}", name),
        );
        ctx.records.insert(&record, None).await.unwrap();
    }
}

#[tokio::test]
async fn test_predictions_newest_first() {
    let ctx = context(ServiceConfig::default(), None).await;
    let token = login(&ctx).await;
    seed(&ctx).await;

    let (status, json) = send(ctx.app(), get_request("/v1/predictions", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["collection"], "predictions");
    let names: Vec<&str> = json["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["fileName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["third.png", "second.png", "first.png"]);
}

#[tokio::test]
async fn test_predictions_limit() {
    let ctx = context(ServiceConfig::default(), None).await;
    let token = login(&ctx).await;
    seed(&ctx).await;

    let (status, json) =
        send(ctx.app(), get_request("/v1/predictions?limit=1", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["predictions"][0]["fileName"], "third.png");
}

#[tokio::test]
async fn test_predictions_zero_limit() {
    let ctx = context(ServiceConfig::default(), None).await;
    let token = login(&ctx).await;

    let (status, json) =
        send(ctx.app(), get_request("/v1/predictions?limit=0", Some(&token))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "limit");
}

#[tokio::test]
async fn test_predictions_require_login() {
    let ctx = context(ServiceConfig::default(), None).await;
    seed(&ctx).await;

    let (status, _) = send(ctx.app(), get_request("/v1/predictions", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_analysis_shows_up_in_history() {
    let ctx = context(ServiceConfig::default(), pneumonia()).await;
    let token = login(&ctx).await;
    let body = multipart_body("image", "fresh.png", "image/png", &png_bytes(20, 20));
    let (status, _) = send(ctx.app(), multipart_request(Some(&token), body)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(ctx.app(), get_request("/v1/predictions", Some(&token))).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["predictions"][0]["label"], "PNEUMONIA");
    assert_eq!(json["predictions"][0]["userEmail"], TEST_EMAIL);
}

#[tokio::test]
async fn test_predictions_bad_limit_is_json_error() {
    let ctx = context(ServiceConfig::default(), None).await;
    let token = login(&ctx).await;

    for uri in ["/v1/predictions?limit=abc", "/v1/predictions?limit=-1"] {
        let (status, json) = send(ctx.app(), get_request(uri, Some(&token))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["error_type"], "invalid_request", "{}", uri);
        assert!(json["message"].as_str().is_some());
    }
}
