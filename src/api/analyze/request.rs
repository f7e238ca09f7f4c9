// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis request types and validation

use serde::{Deserialize, Serialize};

use crate::analysis::UploadedImage;
use crate::api::errors::ApiError;
use crate::vision::image_utils::decode_base64_payload;

/// File name used when the client sends none
pub const DEFAULT_FILE_NAME: &str = "upload";

/// JSON variant of an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64-encoded image, optionally as a data URL
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub file_name: Option<String>,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "image is required".to_string(),
            });
        }
        Ok(())
    }

    /// Decoded upload, ready for analysis
    pub fn into_upload(self) -> Result<UploadedImage, ApiError> {
        self.validate()?;

        let bytes = decode_base64_payload(self.image.as_deref().unwrap_or_default())?;
        let file_name = self
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        Ok(UploadedImage::new(file_name, bytes))
    }
}
