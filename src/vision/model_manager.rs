// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classifier model manager
//!
//! Locates the weights on disk, fetching them from the bucket on first
//! start, and loads them once for the lifetime of the process.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::classifier::{ImageClassifier, OnnxClassifier};
use crate::firebase::ObjectStorage;

/// Where the classifier weights live
#[derive(Debug, Clone)]
pub struct ClassifierModelConfig {
    /// Local ONNX file
    pub model_path: PathBuf,
    /// Bucket object to fetch when `model_path` does not exist
    pub remote_object: Option<String>,
    pub cache_dir: PathBuf,
}

impl Default for ClassifierModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/xray_classifier.onnx"),
            remote_object: Some("models/xray_classifier.onnx".to_string()),
            cache_dir: PathBuf::from("./models"),
        }
    }
}

/// Reported by `GET /v1/models`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierModelInfo {
    pub name: String,
    pub model_type: String,
    pub available: bool,
    pub labels: Vec<String>,
}

/// Holds the loaded classifier, if any
pub struct ClassifierModelManager {
    classifier: Option<Arc<dyn ImageClassifier>>,
}

impl ClassifierModelManager {
    /// Resolve and load the classifier
    ///
    /// A missing or unloadable model is logged and leaves the manager
    /// without a classifier; analysis then reports the service unavailable.
    pub async fn new(
        config: ClassifierModelConfig,
        storage: Option<Arc<dyn ObjectStorage>>,
    ) -> Result<Self> {
        let path = match resolve_model_path(&config, storage.as_deref()).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("⚠️ Classifier weights unavailable: {:#}", e);
                return Ok(Self { classifier: None });
            }
        };

        let load_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || OnnxClassifier::load(load_path))
            .await
            .context("Classifier loading task panicked")?;

        let classifier = match loaded {
            Ok(model) => {
                tracing::info!("✅ Classifier loaded from {}", path.display());
                Some(Arc::new(model) as Arc<dyn ImageClassifier>)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Failed to load classifier from {}: {:#}",
                    path.display(),
                    e
                );
                None
            }
        };

        Ok(Self { classifier })
    }

    /// Use an already constructed classifier
    pub fn from_classifier(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    pub fn empty() -> Self {
        Self { classifier: None }
    }

    pub fn get_classifier(&self) -> Option<Arc<dyn ImageClassifier>> {
        self.classifier.clone()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn model_info(&self) -> ClassifierModelInfo {
        ClassifierModelInfo {
            name: self
                .classifier
                .as_ref()
                .map(|c| c.name())
                .unwrap_or_else(|| "xray-classifier".to_string()),
            model_type: "image-classification".to_string(),
            available: self.classifier.is_some(),
            labels: crate::records::Label::ALL
                .iter()
                .map(|l| l.as_str().to_string())
                .collect(),
        }
    }
}

/// Local weights path, downloading from the bucket when absent
async fn resolve_model_path(
    config: &ClassifierModelConfig,
    storage: Option<&dyn ObjectStorage>,
) -> Result<PathBuf> {
    if config.model_path.exists() {
        return Ok(config.model_path.clone());
    }

    let (Some(object), Some(storage)) = (config.remote_object.as_deref(), storage) else {
        anyhow::bail!(
            "{} does not exist and no remote object is configured",
            config.model_path.display()
        );
    };

    let file_name = Path::new(object)
        .file_name()
        .context("Remote model object has no file name")?;
    let dest = config.cache_dir.join(file_name);

    if !dest.exists() {
        fetch_model_artifact(storage, object, &dest).await?;
    }
    Ok(dest)
}

/// Download `object` to `dest`, writing a temporary file first
pub async fn fetch_model_artifact(
    storage: &dyn ObjectStorage,
    object: &str,
    dest: &Path,
) -> Result<u64> {
    tracing::info!(
        "📥 Fetching classifier weights gs://{}/{}",
        storage.bucket(),
        object
    );

    let bytes = storage
        .download(object, None)
        .await
        .with_context(|| format!("Failed to download {}", object))?;

    if bytes.is_empty() {
        anyhow::bail!("Downloaded model {} is empty", object);
    }

    write_model_file(dest, &bytes).await?;
    Ok(bytes.len() as u64)
}

/// Write `bytes` to `dest` through a `.part` file, returning the sha256 digest
///
/// A reader never sees a half-written model at `dest`.
pub async fn write_model_file(dest: &Path, bytes: &[u8]) -> Result<String> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp = dest.with_extension("part");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .with_context(|| format!("Failed to move model into {}", dest.display()))?;

    let digest = hex::encode(Sha256::digest(bytes));
    tracing::info!(
        "✅ Saved {} bytes to {} (sha256 {})",
        bytes.len(),
        dest.display(),
        digest
    );

    Ok(digest)
}
