// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigError, ServiceBackend, ServiceConfig};
use crate::firebase::{
    FirebaseObjectStorage, FirebaseServices, ObjectStorage, ServiceAccountKey,
    ServiceAccountTokenSource,
};
use crate::vision::{decode_image_bytes, write_model_file, ImageClassifier, OnnxClassifier};

/// Object written by `upload-test`
pub const UPLOAD_TEST_PATH: &str = "test/test_upload.txt";
pub const UPLOAD_TEST_CONTENT: &str = "Hello Firebase!";

/// Arguments for classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image file to classify
    pub image: PathBuf,

    /// ONNX model (defaults to MODEL_PATH)
    #[arg(long)]
    pub model: Option<PathBuf>,
}

/// Arguments for upload-test command
#[derive(Args, Debug)]
pub struct UploadTestArgs {
    /// Object path in the bucket
    #[arg(long, default_value = UPLOAD_TEST_PATH)]
    pub path: String,
}

/// Arguments for login command
#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Password (can also be set via FIREBASE_PASSWORD env var)
    #[arg(long, env = "FIREBASE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for fetch-model command
#[derive(Args, Debug)]
pub struct FetchModelArgs {
    /// Bucket object (defaults to MODEL_REMOTE_OBJECT)
    #[arg(long)]
    pub object: Option<String>,

    /// Destination file (defaults to MODEL_PATH)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn classify(settings: &ServiceConfig, args: ClassifyArgs) -> Result<()> {
    let model_path = args.model.unwrap_or_else(|| settings.model_path.clone());

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let (image, image_info) = decode_image_bytes(&bytes)?;

    let prediction = tokio::task::spawn_blocking(move || {
        let classifier = OnnxClassifier::load(&model_path)?;
        classifier.classify(&image)
    })
    .await
    .context("Classifier task panicked")??;

    println!("Image:      {} ({}x{})", args.image.display(), image_info.width, image_info.height);
    println!("Prediction: {}", prediction.label);
    println!("Confidence: {:.1}%", prediction.confidence * 100.0);
    println!(
        "Scores:     NORMAL {:.4}, PNEUMONIA {:.4}",
        prediction.probabilities[0], prediction.probabilities[1]
    );
    println!("Time:       {}ms", prediction.processing_time_ms);
    Ok(())
}

pub async fn upload_test(settings: &ServiceConfig, args: UploadTestArgs) -> Result<()> {
    if settings.service_backend == ServiceBackend::Mock {
        warn!("SERVICE_BACKEND is mock; the upload stays in memory");
    }
    let services = FirebaseServices::from_settings(settings)?;

    let stored = services
        .storage
        .upload(
            &args.path,
            UPLOAD_TEST_CONTENT.as_bytes().to_vec(),
            "text/plain",
            None,
        )
        .await?;

    println!("✅ File uploaded successfully!");
    println!("🌐 Public URL: {}", stored.public_url);
    Ok(())
}

pub async fn login(settings: &ServiceConfig, args: LoginArgs) -> Result<()> {
    let services = FirebaseServices::from_settings(settings)?;

    match services.auth.sign_in(args.email.trim(), &args.password).await {
        Ok(session) => {
            println!("Login successful! ({}, uid {})", session.email, session.user_id);
            Ok(())
        }
        Err(e) => Err(anyhow!("Error: {}", e)),
    }
}

fn firebase_storage(settings: &ServiceConfig) -> Result<FirebaseObjectStorage> {
    let config = settings
        .firebase_config()?
        .ok_or(ConfigError::MissingFirebaseConfig)?;

    let client = reqwest::Client::new();
    let tokens = match &settings.service_account_path {
        Some(path) => Some(Arc::new(ServiceAccountTokenSource::new(
            ServiceAccountKey::from_file(path)?,
            client.clone(),
        ))),
        None => None,
    };

    Ok(FirebaseObjectStorage::new(
        client,
        config.storage_bucket,
        tokens,
    ))
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

pub async fn fetch_model(settings: &ServiceConfig, args: FetchModelArgs) -> Result<()> {
    let object = args
        .object
        .or_else(|| settings.model_remote_object.clone())
        .ok_or_else(|| anyhow!("No model object given and MODEL_REMOTE_OBJECT is unset"))?;
    let output = args.output.unwrap_or_else(|| settings.model_path.clone());

    let storage = firebase_storage(settings)?;
    info!("📥 Downloading gs://{}/{}", storage.bucket(), object);

    let bar = progress_bar();
    let data = storage
        .download_with_progress(&object, None, |received, total| {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(received);
        })
        .await?;
    bar.finish_and_clear();

    let digest = write_model_file(&output, &data).await?;

    println!("✅ Saved {} bytes to {}", data.len(), output.display());
    println!("   sha256 {}", digest);
    Ok(())
}
