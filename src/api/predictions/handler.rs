// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use super::response::PredictionsResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PredictionsQuery {
    pub limit: Option<usize>,
}

impl PredictionsQuery {
    /// Requested limit, capped at `MAX_LIMIT`
    pub fn effective_limit(&self) -> Result<usize, ApiError> {
        match self.limit {
            Some(0) => Err(ApiError::ValidationError {
                field: "limit".to_string(),
                message: "limit must be at least 1".to_string(),
            }),
            Some(n) => Ok(n.min(MAX_LIMIT)),
            None => Ok(DEFAULT_LIMIT),
        }
    }
}

/// GET /v1/predictions?limit=N
pub async fn predictions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PredictionsQuery>, QueryRejection>,
) -> Result<Json<PredictionsResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let Query(query) = query?;
    let limit = query.effective_limit()?;

    let predictions = state
        .records
        .list_recent(limit, user.as_ref().map(|u| u.id_token.as_str()))
        .await?;

    debug!("Listing {} predictions", predictions.len());
    Ok(Json(PredictionsResponse {
        count: predictions.len(),
        predictions,
        collection: state.records.collection().to_string(),
    }))
}
