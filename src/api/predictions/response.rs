// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::records::PredictionRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsResponse {
    /// Newest first
    pub predictions: Vec<PredictionRecord>,
    pub count: usize,
    pub collection: String,
}
