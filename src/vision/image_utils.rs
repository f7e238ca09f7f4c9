// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of uploaded X-ray images

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum accepted upload size (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image is too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Metadata of a decoded upload
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

impl ImageInfo {
    /// MIME type to store the original bytes under
    pub fn content_type(&self) -> &'static str {
        content_type_for(self.format)
    }

    pub fn extension(&self) -> &'static str {
        format_to_extension(self.format)
    }
}

/// Decode a base64-encoded image (JSON upload variant)
///
/// A `data:image/...;base64,` prefix is accepted and stripped.
pub fn decode_base64_image(base64_str: &str) -> Result<(DynamicImage, ImageInfo), ImageError> {
    let bytes = decode_base64_payload(base64_str)?;
    decode_image_bytes(&bytes)
}

/// Raw bytes of a base64 payload, with any data URL prefix removed
pub fn decode_base64_payload(base64_str: &str) -> Result<Vec<u8>, ImageError> {
    let payload = match base64_str.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => base64_str,
    };

    if payload.trim().is_empty() {
        return Err(ImageError::EmptyData);
    }

    Ok(STANDARD.decode(payload.trim())?)
}

/// Decode raw image bytes (multipart uploads)
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge {
            size: bytes.len(),
            max: MAX_IMAGE_SIZE,
        });
    }

    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF87a / GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF, either byte order
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "bin",
    }
}

pub fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}
