// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, response::Html, Json};
use serde::{Deserialize, Serialize};

use super::http_server::AppState;
use super::page::render_index;
use crate::config::ServiceBackend;
use crate::version;
use crate::vision::ClassifierModelInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub version: String,
    pub build: String,
    pub features: Vec<String>,
    pub classifier_loaded: bool,
    pub backend: ServiceBackend,
    pub require_login: bool,
    pub persist_predictions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ClassifierModelInfo>,
}

/// GET /
pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(render_index(
        state.settings.require_login,
        state.settings.persist_predictions,
    ))
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier_loaded = state
        .model_manager
        .read()
        .await
        .as_ref()
        .map(|m| m.has_classifier())
        .unwrap_or(false);

    let mut issues = Vec::new();
    if !classifier_loaded {
        issues.push("Classifier model not loaded".to_string());
    }

    Json(HealthResponse {
        status: if issues.is_empty() { "healthy" } else { "degraded" }.to_string(),
        version: version::VERSION_NUMBER.to_string(),
        build: version::VERSION.to_string(),
        features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
        classifier_loaded,
        backend: state.settings.service_backend,
        require_login: state.settings.require_login,
        persist_predictions: state.settings.persist_predictions,
        issues: if issues.is_empty() { None } else { Some(issues) },
    })
}

/// GET /v1/models
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let info = match state.model_manager.read().await.as_ref() {
        Some(manager) => manager.model_info(),
        None => crate::vision::ClassifierModelManager::empty().model_info(),
    };
    Json(ModelsResponse { models: vec![info] })
}
