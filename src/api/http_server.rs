// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderValue},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::analyze::analyze_handler;
use super::auth::{bearer_token, login_handler, logout_handler, signup_handler};
use super::errors::ApiError;
use super::handlers::{health_handler, index_handler, models_handler};
use super::predictions::predictions_handler;
use crate::analysis::Analyzer;
use crate::config::ServiceConfig;
use crate::firebase::{AuthProvider, AuthSession, FirebaseServices, ObjectStorage, RecordStore};
use crate::session::SessionStore;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::ClassifierModelManager;

/// Multipart framing and base64 inflation on top of the image limit
pub const MAX_BODY_SIZE: usize = MAX_IMAGE_SIZE * 3 / 2 + 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ServiceConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub records: Arc<dyn RecordStore>,
    pub sessions: SessionStore,
    pub model_manager: Arc<RwLock<Option<Arc<ClassifierModelManager>>>>,
}

impl AppState {
    pub fn new(settings: ServiceConfig, services: FirebaseServices) -> Self {
        let sessions = SessionStore::with_ttl(settings.session_ttl());
        Self {
            settings: Arc::new(settings),
            auth: services.auth,
            storage: services.storage,
            records: services.records,
            sessions,
            model_manager: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_model_manager(&self, manager: Arc<ClassifierModelManager>) {
        *self.model_manager.write().await = Some(manager);
    }

    /// Analyzer for the loaded classifier, honouring `persist_predictions`
    pub async fn analyzer(&self) -> Result<Analyzer, ApiError> {
        let guard = self.model_manager.read().await;
        let classifier = guard
            .as_ref()
            .and_then(|manager| manager.get_classifier())
            .ok_or_else(|| ApiError::ServiceUnavailable("Classifier model not loaded".into()))?;

        let analyzer = Analyzer::new(classifier);
        Ok(if self.settings.persist_predictions {
            analyzer.with_persistence(self.storage.clone(), self.records.clone())
        } else {
            analyzer
        })
    }

    /// The caller's session
    ///
    /// With the login gate on, a missing or unknown token is rejected.
    /// Without it, an unknown token is ignored.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<AuthSession>, ApiError> {
        let session = match bearer_token(headers) {
            Some(token) => self.sessions.get(token).await,
            None => None,
        };

        if session.is_none() && self.settings.require_login {
            return Err(ApiError::Unauthorized(
                "Login required: log in to continue".to_string(),
            ));
        }
        Ok(session)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_allowed_origins);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/v1/models", get(models_handler))
        .route("/v1/auth/login", post(login_handler))
        .route("/v1/auth/signup", post(signup_handler))
        .route("/v1/auth/logout", post(logout_handler))
        .route("/v1/analyze", post(analyze_handler))
        .route("/v1/predictions", get(predictions_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn start_server<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = state.settings.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🌐 API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
