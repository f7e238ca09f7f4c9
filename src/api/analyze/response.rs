// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis response types

use serde::Serialize;

use crate::analysis::AnalysisOutcome;

/// Response from POST /v1/analyze
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
    /// Classifier that produced the label
    pub model: String,
    /// Whether the image and record were saved
    pub persisted: bool,
}
