// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::analysis::AnalysisError;
use crate::firebase::{AuthError, DatabaseError, StorageError};
use crate::vision::ImageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    Unauthorized(String),
    Conflict(String),
    PayloadTooLarge(String),
    ServiceUnavailable(String),
    /// Auth, storage or database call failed
    UpstreamError { service: String, message: String },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::Unauthorized(msg) => ("unauthorized", msg.clone(), None),
            ApiError::Conflict(msg) => ("conflict", msg.clone(), None),
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg.clone(), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::UpstreamError { service, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "service".to_string(),
                    serde_json::Value::String(service.clone()),
                );
                ("upstream_error", message.clone(), Some(details))
            }
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn upstream(service: &str, message: impl fmt::Display) -> Self {
        ApiError::UpstreamError {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::UpstreamError { service, message } => {
                write!(f, "{} error: {}", service, message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            warn!("[{}] {}", request_id, self);
        }

        (status, Json(self.to_response(Some(request_id)))).into_response()
    }
}

/// Extractor rejections keep the JSON error body; anything but an oversized
/// body is a 400, including a missing `Content-Type`
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::UserDisabled
            | AuthError::TooManyAttempts => ApiError::Unauthorized(err.to_string()),
            AuthError::EmailExists => ApiError::Conflict(err.to_string()),
            AuthError::WeakPassword(message) => ApiError::ValidationError {
                field: "password".to_string(),
                message,
            },
            AuthError::InvalidEmail(message) => ApiError::ValidationError {
                field: "email".to_string(),
                message,
            },
            AuthError::NetworkError(_) | AuthError::ServerError(_) => {
                ApiError::upstream("auth", err)
            }
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            too_large @ ImageError::TooLarge { .. } => {
                ApiError::PayloadTooLarge(too_large.to_string())
            }
            other => ApiError::InvalidRequest(format!("Invalid image: {}", other)),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::upstream("storage", err)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidRecord(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::upstream("database", other),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidImage(e) => e.into(),
            AnalysisError::Storage(e) => e.into(),
            AnalysisError::Database(e) => e.into(),
            AnalysisError::Classification(msg) => {
                ApiError::InternalError(format!("Classification failed: {}", msg))
            }
            AnalysisError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}
