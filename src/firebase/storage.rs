// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::credentials::ServiceAccountTokenSource;

const FIREBASE_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";
const PUBLIC_STORAGE_URL: &str = "https://storage.googleapis.com";

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

/// An object written to the bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub path: String,
    pub size: u64,
    pub content_type: String,
    pub public_url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `data` under `path`. `user_token` is the caller's ID token and is
    /// only used when the backend has no service credentials of its own.
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        user_token: Option<&str>,
    ) -> Result<StoredObject, StorageError>;

    async fn download(&self, path: &str, user_token: Option<&str>)
        -> Result<Vec<u8>, StorageError>;

    /// Public URL of an object in this bucket
    fn public_url(&self, path: &str) -> String;

    fn bucket(&self) -> &str;
}

/// Object names must be relative and must not escape their prefix
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("Empty path".to_string()));
    }

    if path.starts_with('/') {
        return Err(StorageError::InvalidPath(
            "Path cannot start with /".to_string(),
        ));
    }

    if path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(StorageError::InvalidPath(format!(
            "Path contains empty or parent segments: {}",
            path
        )));
    }

    Ok(())
}

/// Percent-encode a whole object name, slashes included
pub fn encode_object_name(path: &str) -> String {
    url::form_urlencoded::byte_serialize(path.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn public_bucket_url(bucket: &str, path: &str) -> String {
    let encoded_segments: Vec<String> = path.split('/').map(encode_object_name).collect();
    format!("{}/{}/{}", PUBLIC_STORAGE_URL, bucket, encoded_segments.join("/"))
}

#[derive(Debug)]
struct MockObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-memory bucket
#[derive(Debug, Clone)]
pub struct MockObjectStorage {
    bucket: String,
    objects: Arc<Mutex<HashMap<String, MockObject>>>,
    injected_error: Arc<Mutex<Option<StorageError>>>,
}

impl MockObjectStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            injected_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Fail the next call with `error`
    pub async fn inject_error(&self, error: StorageError) {
        *self.injected_error.lock().await = Some(error);
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(path)
            .map(|o| o.content_type.clone())
    }

    async fn check_injected_error(&self) -> Result<(), StorageError> {
        match self.injected_error.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        _user_token: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        self.check_injected_error().await?;
        validate_object_path(path)?;

        let stored = StoredObject {
            path: path.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            public_url: self.public_url(path),
        };

        self.objects.lock().await.insert(
            path.to_string(),
            MockObject {
                data,
                content_type: content_type.to_string(),
            },
        );

        Ok(stored)
    }

    async fn download(
        &self,
        path: &str,
        _user_token: Option<&str>,
    ) -> Result<Vec<u8>, StorageError> {
        self.check_injected_error().await?;
        validate_object_path(path)?;

        self.objects
            .lock()
            .await
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        public_bucket_url(&self.bucket, path)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    /// Byte count, sent as a string
    size: Option<String>,
    download_tokens: Option<String>,
}

/// Firebase Storage REST backend
pub struct FirebaseObjectStorage {
    client: reqwest::Client,
    bucket: String,
    base_url: String,
    tokens: Option<Arc<ServiceAccountTokenSource>>,
}

impl FirebaseObjectStorage {
    pub fn new(
        client: reqwest::Client,
        bucket: impl Into<String>,
        tokens: Option<Arc<ServiceAccountTokenSource>>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            base_url: FIREBASE_STORAGE_URL.to_string(),
            tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn objects_url(&self) -> String {
        format!("{}/v0/b/{}/o", self.base_url, self.bucket)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url(), encode_object_name(path))
    }

    /// URL carrying a download token; readable without further credentials
    pub fn token_url(&self, path: &str, token: &str) -> String {
        format!("{}?alt=media&token={}", self.object_url(path), token)
    }

    /// Stream an object into memory, reporting `(received, total)` per chunk
    pub async fn download_with_progress<F>(
        &self,
        path: &str,
        user_token: Option<&str>,
        mut on_progress: F,
    ) -> Result<Vec<u8>, StorageError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        validate_object_path(path)?;

        let mut request = self.client.get(self.object_url(path)).query(&[("alt", "media")]);
        if let Some(token) = self.bearer(user_token).await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        Self::check_status(response.status(), path)?;

        let total = response.content_length();
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::NetworkError(e.to_string()))?;
            data.extend_from_slice(&chunk);
            on_progress(data.len() as u64, total);
        }

        debug!("Downloaded {} ({} bytes)", path, data.len());
        Ok(data)
    }

    async fn bearer(&self, user_token: Option<&str>) -> Result<Option<String>, StorageError> {
        match &self.tokens {
            Some(source) => source
                .access_token()
                .await
                .map(Some)
                .map_err(|e| StorageError::Unauthorized(e.to_string())),
            None => Ok(user_token.map(str::to_string)),
        }
    }

    fn check_status(status: reqwest::StatusCode, path: &str) -> Result<(), StorageError> {
        match status {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(StorageError::Unauthorized(format!("{} for {}", status, path)))
            }
            other => Err(StorageError::ServerError(format!(
                "Storage request failed: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl ObjectStorage for FirebaseObjectStorage {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        user_token: Option<&str>,
    ) -> Result<StoredObject, StorageError> {
        validate_object_path(path)?;

        let size = data.len() as u64;
        let mut request = self
            .client
            .post(self.objects_url())
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);

        if let Some(token) = self.bearer(user_token).await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        Self::check_status(response.status(), path)?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let public_url = match body
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
        {
            Some(token) if !token.is_empty() => self.token_url(&body.name, token),
            _ => self.public_url(&body.name),
        };

        debug!("Uploaded gs://{}/{} ({} bytes)", self.bucket, body.name, size);

        Ok(StoredObject {
            size: body
                .size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(size),
            path: body.name,
            content_type: content_type.to_string(),
            public_url,
        })
    }

    async fn download(
        &self,
        path: &str,
        user_token: Option<&str>,
    ) -> Result<Vec<u8>, StorageError> {
        self.download_with_progress(path, user_token, |_, _| {}).await
    }

    fn public_url(&self, path: &str) -> String {
        public_bucket_url(&self.bucket, path)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
