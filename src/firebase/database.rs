// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction record persistence
//!
//! Records are plain documents in a single collection. The Firestore backend
//! speaks the REST API with typed field values; the mock keeps records in a
//! vector.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::credentials::ServiceAccountTokenSource;
use crate::records::{Label, PredictionRecord};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Default collection for prediction records
pub const DEFAULT_COLLECTION: &str = "predictions";

#[derive(Debug, Error, Clone)]
pub enum DatabaseError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write a new record and return its document id
    async fn insert(
        &self,
        record: &PredictionRecord,
        user_token: Option<&str>,
    ) -> Result<String, DatabaseError>;

    /// Most recent records first
    async fn list_recent(
        &self,
        limit: usize,
        user_token: Option<&str>,
    ) -> Result<Vec<PredictionRecord>, DatabaseError>;

    fn collection(&self) -> &str;
}

fn check_record(record: &PredictionRecord) -> Result<(), DatabaseError> {
    if !record.is_complete() {
        return Err(DatabaseError::InvalidRecord(
            "file name and image URL are required".to_string(),
        ));
    }
    Ok(())
}

/// In-memory record store
#[derive(Debug, Clone)]
pub struct MockRecordStore {
    collection: String,
    records: Arc<RwLock<Vec<PredictionRecord>>>,
    injected_error: Arc<Mutex<Option<DatabaseError>>>,
}

impl MockRecordStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: Arc::new(RwLock::new(Vec::new())),
            injected_error: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn inject_error(&self, error: DatabaseError) {
        *self.injected_error.lock().await = Some(error);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<PredictionRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn insert(
        &self,
        record: &PredictionRecord,
        _user_token: Option<&str>,
    ) -> Result<String, DatabaseError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        check_record(record)?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        self.records.write().await.push(stored);

        Ok(id)
    }

    async fn list_recent(
        &self,
        limit: usize,
        _user_token: Option<&str>,
    ) -> Result<Vec<PredictionRecord>, DatabaseError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }

        let mut records = self.records.read().await.clone();
        records.sort_by_key(|r| r.timestamp);
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

/// Encode a record as a Firestore document body
pub fn record_to_document(record: &PredictionRecord) -> Value {
    let mut fields = json!({
        "filename": { "stringValue": record.file_name },
        "prediction": { "stringValue": record.label.as_str() },
        "confidence": { "doubleValue": record.confidence as f64 },
        "timestamp": {
            "timestampValue": record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
        },
        "image_url": { "stringValue": record.image_url },
    });

    if let Some(email) = &record.user_email {
        fields["user_email"] = json!({ "stringValue": email });
    }

    json!({ "fields": fields })
}

fn string_field<'a>(fields: &'a Value, name: &str) -> Result<&'a str, DatabaseError> {
    fields[name]["stringValue"]
        .as_str()
        .ok_or_else(|| DatabaseError::SerializationError(format!("missing field {}", name)))
}

/// Decode a Firestore document into a record
pub fn document_to_record(document: &Value) -> Result<PredictionRecord, DatabaseError> {
    let fields = &document["fields"];

    let label: Label = string_field(fields, "prediction")?
        .parse()
        .map_err(|e: crate::records::LabelError| DatabaseError::SerializationError(e.to_string()))?;

    let timestamp = fields["timestamp"]["timestampValue"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| DatabaseError::SerializationError("missing field timestamp".to_string()))?;

    // Firestore may return whole numbers as integerValue strings
    let confidence = fields["confidence"]["doubleValue"]
        .as_f64()
        .or_else(|| {
            fields["confidence"]["integerValue"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
        });

    // Records written without a score (older four-field documents) read as 0.0
    let confidence = match confidence {
        Some(value) => value as f32,
        None => {
            warn!(
                "Prediction document {} has no confidence, reading it as 0.0",
                document["name"].as_str().unwrap_or("<unnamed>")
            );
            0.0
        }
    };

    let id = document["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .map(str::to_string);

    Ok(PredictionRecord {
        id,
        file_name: string_field(fields, "filename")?.to_string(),
        label,
        confidence,
        timestamp,
        image_url: string_field(fields, "image_url")?.to_string(),
        user_email: fields["user_email"]["stringValue"].as_str().map(str::to_string),
    })
}

/// Firestore REST backend
pub struct FirestoreRecordStore {
    client: reqwest::Client,
    project_id: String,
    collection: String,
    base_url: String,
    tokens: Option<Arc<ServiceAccountTokenSource>>,
}

impl FirestoreRecordStore {
    pub fn new(
        client: reqwest::Client,
        project_id: impl Into<String>,
        collection: impl Into<String>,
        tokens: Option<Arc<ServiceAccountTokenSource>>,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            collection: collection.into(),
            base_url: FIRESTORE_URL.to_string(),
            tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        user_token: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, DatabaseError> {
        let token = match &self.tokens {
            Some(source) => Some(
                source
                    .access_token()
                    .await
                    .map_err(|e| DatabaseError::Unauthorized(e.to_string()))?,
            ),
            None => user_token.map(str::to_string),
        };

        Ok(match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        user_token: Option<&str>,
    ) -> Result<Value, DatabaseError> {
        let response = self
            .authorize(request, user_token)
            .await?
            .send()
            .await
            .map_err(|e| DatabaseError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DatabaseError::Unauthorized(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatabaseError::ServerError(format!("{}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for FirestoreRecordStore {
    async fn insert(
        &self,
        record: &PredictionRecord,
        user_token: Option<&str>,
    ) -> Result<String, DatabaseError> {
        check_record(record)?;

        let url = format!("{}/{}", self.documents_url(), self.collection);
        let request = self.client.post(&url).json(&record_to_document(record));
        let created = self.send_json(request, user_token).await?;

        let id = created["name"]
            .as_str()
            .and_then(|name| name.rsplit('/').next())
            .map(str::to_string)
            .ok_or_else(|| {
                DatabaseError::SerializationError("document name missing in response".to_string())
            })?;

        debug!("Stored prediction record {}/{}", self.collection, id);
        Ok(id)
    }

    async fn list_recent(
        &self,
        limit: usize,
        user_token: Option<&str>,
    ) -> Result<Vec<PredictionRecord>, DatabaseError> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }],
                "limit": limit
            }
        });

        let url = format!("{}:runQuery", self.documents_url());
        let request = self.client.post(&url).json(&query);
        let rows = self.send_json(request, user_token).await?;

        rows.as_array()
            .into_iter()
            .flatten()
            .filter(|row| row.get("document").is_some())
            .map(|row| document_to_record(&row["document"]))
            .collect()
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
