// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the X-ray classifier

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Square input resolution expected by the classifier
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocess an image for classification
///
/// Steps:
/// 1. Convert to RGB (X-rays usually arrive as grayscale)
/// 2. Resize to 224x224 (no aspect ratio preservation, same as training)
/// 3. Scale to [0, 1]
/// 4. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 5. Lay out as NCHW with a batch dimension: [1, 3, 224, 224]
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let size = CLASSIFIER_INPUT_SIZE as usize;
    let resized = image.resize_exact(
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_INPUT_SIZE,
        FilterType::Triangle,
    );
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = normalize(pixel[c], c);
        }
    }

    tensor
}

#[inline]
fn normalize(value: u8, channel: usize) -> f32 {
    (value as f32 / 255.0 - MEAN[channel]) / STD[channel]
}
