// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis pipeline
//!
//! Decode, classify, then (optionally) upload the original image and write a
//! prediction record pointing at it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::firebase::{AuthSession, DatabaseError, ObjectStorage, RecordStore, StorageError};
use crate::records::{Label, PredictionRecord, NUM_CLASSES};
use crate::vision::{decode_image_bytes, ImageClassifier, ImageError};

/// Prefix of every stored X-ray object
pub const IMAGE_PREFIX: &str = "xray_images";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("Classification failed: {0}")]
    Classification(String),
    #[error("Image upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Saving prediction failed: {0}")]
    Database(#[from] DatabaseError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A file as received from the browser
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub file_name: String,
    pub label: Label,
    pub confidence: f32,
    pub probabilities: [f32; NUM_CLASSES],
    pub timestamp: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub processing_time_ms: u64,
    /// Set when the image was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_path: Option<String>,
    /// Set when a prediction record was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

#[derive(Clone)]
struct Persistence {
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn RecordStore>,
}

#[derive(Clone)]
pub struct Analyzer {
    classifier: Arc<dyn ImageClassifier>,
    persistence: Option<Persistence>,
}

impl Analyzer {
    /// Classify only
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            classifier,
            persistence: None,
        }
    }

    /// Also upload each image and record its prediction
    pub fn with_persistence(
        mut self,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        self.persistence = Some(Persistence { storage, records });
        self
    }

    pub fn persists(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn model_name(&self) -> String {
        self.classifier.name()
    }

    pub async fn analyze(
        &self,
        upload: UploadedImage,
        user: Option<&AuthSession>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();
        let UploadedImage { file_name, bytes } = upload;

        let (image, image_info) = decode_image_bytes(&bytes)?;
        debug!(
            "Decoded {} ({}x{}, {:?}, {} bytes)",
            file_name, image_info.width, image_info.height, image_info.format, image_info.size_bytes
        );

        let classifier = self.classifier.clone();
        let prediction = tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .map_err(|e| AnalysisError::Internal(format!("Inference task failed: {}", e)))?
            .map_err(|e| AnalysisError::Classification(format!("{:#}", e)))?;

        let timestamp = Utc::now();
        let mut outcome = AnalysisOutcome {
            file_name: file_name.clone(),
            label: prediction.label,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            timestamp,
            width: image_info.width,
            height: image_info.height,
            processing_time_ms: 0,
            image_url: None,
            object_path: None,
            record_id: None,
        };

        if let Some(persistence) = &self.persistence {
            let user_token = user.map(|u| u.id_token.as_str());
            let safe_name = sanitize_file_name(&file_name, image_info.extension());
            let path = object_path(&safe_name, timestamp);

            let stored = persistence
                .storage
                .upload(&path, bytes, image_info.content_type(), user_token)
                .await?;
            debug!("Stored {} ({} bytes)", stored.path, stored.size);

            let record = PredictionRecord::new(
                safe_name,
                prediction.label,
                prediction.confidence,
                timestamp,
                stored.public_url.clone(),
            )
            .with_user(user.map(|u| u.email.clone()));

            let record_id = match persistence.records.insert(&record, user_token).await {
                Ok(id) => id,
                Err(e) => {
                    warn!("Prediction record not saved, {} stays in storage: {}", path, e);
                    return Err(e.into());
                }
            };

            outcome.image_url = Some(stored.public_url);
            outcome.object_path = Some(stored.path);
            outcome.record_id = Some(record_id);
        }

        outcome.processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "🩻 {} classified as {} ({:.1}%) in {}ms",
            outcome.file_name,
            outcome.label,
            outcome.confidence * 100.0,
            outcome.processing_time_ms
        );

        Ok(outcome)
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap_or_else(|_| unreachable!()))
}

/// File name safe to use as the last segment of an object path
///
/// Directory components are removed and every character outside
/// `[A-Za-z0-9._-]` becomes `_`. Names with nothing usable left fall back to
/// `upload.{extension}`.
pub fn sanitize_file_name(name: &str, extension: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let base = Path::new(base)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned = unsafe_chars().replace_all(&base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.chars().all(|c| c == '_' || c == '.') {
        format!("upload.{}", extension)
    } else {
        cleaned.to_string()
    }
}

/// `xray_images/{yyyyMMddTHHmmssZ}_{uuid8}_{name}`
pub fn object_path(safe_name: &str, at: DateTime<Utc>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}_{}",
        IMAGE_PREFIX,
        at.format("%Y%m%dT%H%M%SZ"),
        &id[..8],
        safe_name
    )
}
