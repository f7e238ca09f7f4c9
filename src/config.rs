// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Built from defaults, then an optional TOML file (`CONFIG_PATH`), then
//! environment variables (a `.env` file is honoured via dotenv).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::firebase::database::DEFAULT_COLLECTION;
use crate::firebase::FirebaseConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid TOML configuration: {0}")]
    Toml(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid Firebase configuration: {0}")]
    Firebase(String),
    #[error("Firebase backend selected but no Firebase configuration was provided")]
    MissingFirebaseConfig,
}

/// Which implementation backs auth, storage and the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceBackend {
    Mock,
    Firebase,
}

impl FromStr for ServiceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" | "memory" => Ok(ServiceBackend::Mock),
            "firebase" => Ok(ServiceBackend::Firebase),
            other => Err(ConfigError::InvalidValue {
                key: "SERVICE_BACKEND".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen_addr: String,
    pub model_path: PathBuf,
    /// Bucket object holding the weights, fetched when `model_path` is missing
    pub model_remote_object: Option<String>,
    pub model_cache_dir: PathBuf,
    /// Login gate in front of analysis
    pub require_login: bool,
    /// Upload images and write prediction records
    pub persist_predictions: bool,
    pub service_backend: ServiceBackend,
    /// Firebase web config as inline JSON
    pub firebase_key: Option<String>,
    pub firebase_config_path: Option<PathBuf>,
    pub service_account_path: Option<PathBuf>,
    pub session_ttl_secs: u64,
    pub predictions_collection: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            model_path: PathBuf::from("./models/xray_classifier.onnx"),
            model_remote_object: Some("models/xray_classifier.onnx".to_string()),
            model_cache_dir: PathBuf::from("./models"),
            require_login: true,
            persist_predictions: true,
            service_backend: ServiceBackend::Mock,
            firebase_key: None,
            firebase_config_path: None,
            service_account_path: None,
            session_ttl_secs: 3600,
            predictions_collection: DEFAULT_COLLECTION.to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl ServiceConfig {
    /// Defaults, then `CONFIG_PATH` if set, then the process environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Override fields from variables returned by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_LISTEN_ADDR") {
            self.listen_addr = v;
        } else if let Some(port) = lookup("API_PORT") {
            self.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODEL_REMOTE_OBJECT") {
            self.model_remote_object = non_empty(v);
        }
        if let Some(v) = lookup("MODEL_CACHE_DIR") {
            self.model_cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("REQUIRE_LOGIN") {
            self.require_login = parse_bool("REQUIRE_LOGIN", &v)?;
        }
        if let Some(v) = lookup("PERSIST_PREDICTIONS") {
            self.persist_predictions = parse_bool("PERSIST_PREDICTIONS", &v)?;
        }
        if let Some(v) = lookup("SERVICE_BACKEND") {
            self.service_backend = v.parse()?;
        }
        if let Some(v) = lookup("FIREBASE_KEY") {
            self.firebase_key = non_empty(v);
        }
        if let Some(v) = lookup("FIREBASE_CONFIG_PATH") {
            self.firebase_config_path = non_empty(v).map(PathBuf::from);
        }
        if let Some(v) = lookup("FIREBASE_SERVICE_ACCOUNT_PATH") {
            self.service_account_path = non_empty(v).map(PathBuf::from);
        }
        if let Some(v) = lookup("SESSION_TTL_SECS") {
            self.session_ttl_secs = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "SESSION_TTL_SECS".to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("PREDICTIONS_COLLECTION") {
            if let Some(v) = non_empty(v) {
                self.predictions_collection = v;
            }
        }
        if let Some(v) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors_allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// The Firebase web config, from inline JSON or a file
    pub fn firebase_config(&self) -> Result<Option<FirebaseConfig>, ConfigError> {
        if let Some(json) = &self.firebase_key {
            return FirebaseConfig::from_json(json).map(Some);
        }
        if let Some(path) = &self.firebase_config_path {
            return FirebaseConfig::from_file(path).map(Some);
        }
        Ok(None)
    }
}
