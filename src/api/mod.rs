// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod auth;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod page;
pub mod predictions;

pub use analyze::{analyze_handler, AnalyzeRequest, AnalyzeResponse};
pub use auth::{bearer_token, CredentialsRequest, LoginResponse, LogoutResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, ModelsResponse};
pub use http_server::{create_app, start_server, AppState, MAX_BODY_SIZE};
pub use predictions::{predictions_handler, PredictionsResponse};
