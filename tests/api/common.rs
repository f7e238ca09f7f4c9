// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared helpers for the router tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use medical_classifier::{
    api::{create_app, AppState},
    config::ServiceConfig,
    firebase::{AuthProvider, FirebaseServices, MockAuthProvider, MockObjectStorage, MockRecordStore},
    records::Label,
    vision::{ClassifierModelManager, ImageClassifier, Prediction},
};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "xray-test-boundary";
pub const TEST_EMAIL: &str = "radiologist@example.com";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Classifier that always returns the same label
pub struct FixedClassifier {
    pub label: Label,
    pub confidence: f32,
}

impl ImageClassifier for FixedClassifier {
    fn classify(&self, _image: &DynamicImage) -> anyhow::Result<Prediction> {
        let mut probabilities = [1.0 - self.confidence; 2];
        probabilities[self.label.index()] = self.confidence;
        Ok(Prediction {
            label: self.label,
            confidence: self.confidence,
            probabilities,
            processing_time_ms: 1,
        })
    }

    fn name(&self) -> String {
        "fixed-classifier".to_string()
    }
}

pub struct TestContext {
    pub state: AppState,
    pub auth: MockAuthProvider,
    pub storage: MockObjectStorage,
    pub records: MockRecordStore,
}

impl TestContext {
    pub fn app(&self) -> Router {
        create_app(self.state.clone())
    }
}

/// App state over mock services; `classifier` decides whether a model is loaded
pub async fn context(settings: ServiceConfig, classifier: Option<FixedClassifier>) -> TestContext {
    let auth = MockAuthProvider::new();
    let storage = MockObjectStorage::new("test-bucket");
    let records = MockRecordStore::new(settings.predictions_collection.clone());

    let services = FirebaseServices::from_mocks(auth.clone(), storage.clone(), records.clone());
    let state = AppState::new(settings, services);

    let manager = match classifier {
        Some(c) => ClassifierModelManager::from_classifier(Arc::new(c)),
        None => ClassifierModelManager::empty(),
    };
    state.set_model_manager(Arc::new(manager)).await;

    TestContext {
        state,
        auth,
        storage,
        records,
    }
}

pub fn pneumonia() -> Option<FixedClassifier> {
    Some(FixedClassifier {
        label: Label::Pneumonia,
        confidence: 0.92,
    })
}

/// A small grayscale PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/v1/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Request with an arbitrary body and optional content type
pub fn raw_request(
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    token: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Send a request and parse the JSON body (Null when not JSON)
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register the test user and return a session token
pub async fn login(ctx: &TestContext) -> String {
    ctx.auth.sign_up(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    let (status, body) = send(
        ctx.app(),
        json_request(
            Method::POST,
            "/v1/auth/login",
            None,
            serde_json::json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["sessionToken"].as_str().unwrap().to_string()
}
