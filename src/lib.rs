// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod firebase;
pub mod records;
pub mod session;
pub mod version;
pub mod vision;

pub use analysis::{AnalysisError, AnalysisOutcome, Analyzer, UploadedImage};
pub use config::{ConfigError, ServiceBackend, ServiceConfig};
pub use firebase::{AuthProvider, FirebaseServices, ObjectStorage, RecordStore};
pub use records::{Label, PredictionRecord};
pub use session::SessionStore;
pub use vision::{ClassifierModelManager, ImageClassifier, OnnxClassifier, Prediction};
