// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction labels and the persisted prediction record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of output classes of the classifier head
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("Class index {0} out of range (expected 0..{NUM_CLASSES})")]
    IndexOutOfRange(usize),
    #[error("Unknown label: {0}")]
    Unknown(String),
}

/// The two classes of the chest X-ray classifier
///
/// Index order follows the training folder layout (alphabetical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Normal,
    Pneumonia,
}

impl Label {
    pub const ALL: [Label; NUM_CLASSES] = [Label::Normal, Label::Pneumonia];

    pub fn from_index(index: usize) -> Result<Self, LabelError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(LabelError::IndexOutOfRange(index))
    }

    pub fn index(self) -> usize {
        match self {
            Label::Normal => 0,
            Label::Pneumonia => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "NORMAL",
            Label::Pneumonia => "PNEUMONIA",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Label::Normal),
            "PNEUMONIA" => Ok(Label::Pneumonia),
            other => Err(LabelError::Unknown(other.to_string())),
        }
    }
}

/// One analysis result as written to the document database
///
/// Created once per analysis, never updated or deleted by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    /// Document id, assigned by the store on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub file_name: String,
    pub label: Label,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl PredictionRecord {
    pub fn new(
        file_name: impl Into<String>,
        label: Label,
        confidence: f32,
        timestamp: DateTime<Utc>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            file_name: file_name.into(),
            label,
            confidence,
            timestamp,
            image_url: image_url.into(),
            user_email: None,
        }
    }

    pub fn with_user(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    /// Whether every required field carries a value
    pub fn is_complete(&self) -> bool {
        !self.file_name.is_empty() && !self.image_url.is_empty()
    }
}
