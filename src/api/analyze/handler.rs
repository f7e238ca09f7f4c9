// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis endpoint handler

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::Multipart;
use tracing::{debug, warn};

use super::request::{AnalyzeRequest, DEFAULT_FILE_NAME};
use super::response::AnalyzeResponse;
use crate::analysis::UploadedImage;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn rejection_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::InvalidRequest(message)
    }
}

/// First `image` field of a multipart form
async fn read_multipart(mut multipart: Multipart) -> Result<UploadedImage, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection_error(e.status(), e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| rejection_error(e.status(), e.body_text()))?;

        debug!("Received {} ({} bytes) via multipart", file_name, bytes.len());
        return Ok(UploadedImage::new(file_name, bytes.to_vec()));
    }

    Err(ApiError::ValidationError {
        field: IMAGE_FIELD.to_string(),
        message: "image file is required".to_string(),
    })
}

/// POST /v1/analyze - Classify a chest X-ray
///
/// Accepts either a multipart form with an `image` file field or a JSON
/// body `{ "image": "<base64>", "fileName": "..." }`. When saving is enabled
/// the image is uploaded and a prediction record is written.
///
/// # Errors
/// - 400: no image, or the bytes are not a supported image
/// - 401: login required and no valid session
/// - 413: image too large
/// - 503: classifier not loaded
/// - 502: storage or database failure
pub async fn analyze_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let analyzer = state.analyzer().await?;

    let upload = if is_multipart(&headers) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = Json::<AnalyzeRequest>::from_request(request, &state).await?;
        body.into_upload()?
    };

    let outcome = analyzer.analyze(upload, user.as_ref()).await.map_err(|e| {
        warn!("Analysis failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(AnalyzeResponse {
        outcome,
        model: analyzer.model_name(),
        persisted: analyzer.persists(),
    }))
}
