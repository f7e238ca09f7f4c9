// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GET /v1/predictions, the recent analysis history

pub mod handler;
pub mod response;

pub use handler::{predictions_handler, PredictionsQuery, DEFAULT_LIMIT, MAX_LIMIT};
pub use response::PredictionsResponse;
