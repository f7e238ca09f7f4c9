// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for chest X-ray classification
//!
//! Decoding and validation of uploaded images, resizing and normalization
//! into the network's input tensor, and CPU inference via ONNX Runtime.

pub mod classifier;
pub mod image_utils;
pub mod model_manager;
pub mod preprocessing;

pub use classifier::{ImageClassifier, OnnxClassifier, Prediction};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, detect_format, ImageError, ImageInfo,
};
pub use model_manager::{
    fetch_model_artifact, write_model_file, ClassifierModelConfig, ClassifierModelInfo,
    ClassifierModelManager,
};
pub use preprocessing::preprocess_for_classification;
