// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Medical Classifier service

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-xray-classifier-2025-06-02";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-06-02";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "chest-xray-classification",
    "onnx-cpu-inference",
    "email-password-login",
    "image-upload",
    "prediction-history",
    "multipart-upload",
    "base64-upload",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Medical Classifier {} ({})", VERSION_NUMBER, BUILD_DATE)
}
