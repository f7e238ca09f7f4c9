// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Firebase integration
//!
//! Authentication, object storage and the prediction record store, each
//! behind a trait with an in-memory mock and a REST backend.

pub mod auth;
pub mod credentials;
pub mod database;
pub mod storage;

pub use auth::{AuthError, AuthProvider, AuthSession, FirebaseAuthProvider, MockAuthProvider};
pub use credentials::{ServiceAccountKey, ServiceAccountTokenSource, TokenError};
pub use database::{
    DatabaseError, FirestoreRecordStore, MockRecordStore, RecordStore, DEFAULT_COLLECTION,
};
pub use storage::{
    FirebaseObjectStorage, MockObjectStorage, ObjectStorage, StorageError, StoredObject,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{ConfigError, ServiceBackend, ServiceConfig};

pub const MOCK_BUCKET: &str = "mock-bucket";

/// Firebase web app configuration, as issued by the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    #[serde(default, rename = "databaseURL", skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl FirebaseConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FirebaseConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Firebase(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("apiKey", &self.api_key),
            ("projectId", &self.project_id),
            ("storageBucket", &self.storage_bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Firebase(format!("{} is empty", name)));
            }
        }
        Ok(())
    }
}

/// The three backing services used by the API
#[derive(Clone)]
pub struct FirebaseServices {
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub records: Arc<dyn RecordStore>,
}

impl FirebaseServices {
    /// In-memory services
    pub fn mock(collection: &str) -> Self {
        Self::from_mocks(
            MockAuthProvider::new(),
            MockObjectStorage::new(MOCK_BUCKET),
            MockRecordStore::new(collection),
        )
    }

    /// Wrap mock handles; callers keep their clones for inspection
    pub fn from_mocks(
        auth: MockAuthProvider,
        storage: MockObjectStorage,
        records: MockRecordStore,
    ) -> Self {
        Self {
            auth: Arc::new(auth),
            storage: Arc::new(storage),
            records: Arc::new(records),
        }
    }

    /// REST-backed services. Storage and Firestore calls use the service
    /// account when given, otherwise the signed-in user's ID token.
    pub fn firebase(
        config: &FirebaseConfig,
        service_account: Option<ServiceAccountKey>,
        collection: &str,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::Firebase(e.to_string()))?;

        let tokens = service_account
            .map(|key| Arc::new(ServiceAccountTokenSource::new(key, client.clone())));

        Ok(Self {
            auth: Arc::new(FirebaseAuthProvider::new(client.clone(), &config.api_key)),
            storage: Arc::new(FirebaseObjectStorage::new(
                client.clone(),
                &config.storage_bucket,
                tokens.clone(),
            )),
            records: Arc::new(FirestoreRecordStore::new(
                client,
                &config.project_id,
                collection,
                tokens,
            )),
        })
    }

    /// Pick the backend named in `settings`
    pub fn from_settings(settings: &ServiceConfig) -> Result<Self, ConfigError> {
        match settings.service_backend {
            ServiceBackend::Mock => {
                info!("Using in-memory auth, storage and record store");
                Ok(Self::mock(&settings.predictions_collection))
            }
            ServiceBackend::Firebase => {
                let config = settings
                    .firebase_config()?
                    .ok_or(ConfigError::MissingFirebaseConfig)?;

                let service_account = match &settings.service_account_path {
                    Some(path) => Some(
                        ServiceAccountKey::from_file(path)
                            .map_err(|e| ConfigError::Firebase(e.to_string()))?,
                    ),
                    None => None,
                };

                info!(
                    "Using Firebase project {} (bucket {}, service account: {})",
                    config.project_id,
                    config.storage_bucket,
                    service_account.is_some()
                );
                Self::firebase(&config, service_account, &settings.predictions_collection)
            }
        }
    }
}
