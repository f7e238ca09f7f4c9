// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use medical_classifier::{
    api::{start_server, AppState},
    config::ServiceConfig,
    firebase::FirebaseServices,
    vision::{ClassifierModelConfig, ClassifierModelManager},
};
use std::{env, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Medical Classifier...\n");
    println!("📦 BUILD VERSION: {}", medical_classifier::version::VERSION);
    println!("📅 Build Date: {}", medical_classifier::version::BUILD_DATE);
    println!();
    tracing::info!("{}", medical_classifier::version::get_version_string());

    let settings = ServiceConfig::load().context("Invalid configuration")?;
    let services =
        FirebaseServices::from_settings(&settings).context("Failed to set up backend services")?;

    // Classifier weights, fetched from the bucket on first start
    let model_config = ClassifierModelConfig {
        model_path: settings.model_path.clone(),
        remote_object: settings.model_remote_object.clone(),
        cache_dir: settings.model_cache_dir.clone(),
    };
    let manager = ClassifierModelManager::new(model_config, Some(services.storage.clone())).await?;
    let info = manager.model_info();
    if info.available {
        println!("✅ Classifier ready: {} ({})", info.name, info.labels.join(", "));
    } else {
        println!("⚠️  No classifier loaded; /v1/analyze will return 503");
    }

    let state = AppState::new(settings.clone(), services);
    state.set_model_manager(Arc::new(manager)).await;

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("  Page:         http://{}/", settings.listen_addr);
    println!("  Health:       GET  http://{}/health", settings.listen_addr);
    println!("  Login:        POST http://{}/v1/auth/login", settings.listen_addr);
    println!("  Analyze:      POST http://{}/v1/analyze", settings.listen_addr);
    println!("  Predictions:  GET  http://{}/v1/predictions", settings.listen_addr);
    println!(
        "  Login gate: {}, saving predictions: {}, backend: {:?}",
        settings.require_login, settings.persist_predictions, settings.service_backend
    );
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    start_server(state, async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
        }
        println!("\n⏹️  Shutting down...");
    })
    .await?;

    println!("👋 Goodbye!");
    Ok(())
}
