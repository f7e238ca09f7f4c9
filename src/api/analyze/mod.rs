// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! X-ray analysis endpoint
//!
//! Provides POST /v1/analyze for classifying an uploaded chest X-ray.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::analyze_handler;
pub use request::AnalyzeRequest;
pub use response::AnalyzeResponse;
