// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use medical_classifier::vision::{
    decode_base64_image, decode_image_bytes, image_utils::MAX_IMAGE_SIZE,
    preprocess_for_classification, ImageError,
};
use std::io::Cursor;

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

fn grayscale(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(ImageBuffer::from_pixel(width, height, Luma([value])))
}

#[test]
fn test_decode_png_and_jpeg() {
    let image = grayscale(64, 48, 120);

    let (decoded, info) = decode_image_bytes(&encode(&image, ImageFormat::Png)).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert_eq!(info.content_type(), "image/png");

    let (_, info) = decode_image_bytes(&encode(&image, ImageFormat::Jpeg)).unwrap();
    assert_eq!(info.format, ImageFormat::Jpeg);
    assert_eq!(info.extension(), "jpg");
}

#[test]
fn test_decode_data_url() {
    let bytes = encode(&grayscale(8, 8, 0), ImageFormat::Png);
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));

    let (_, info) = decode_base64_image(&data_url).unwrap();
    assert_eq!(info.size_bytes, bytes.len());
}

#[test]
fn test_decode_rejects_bad_input() {
    assert!(matches!(decode_image_bytes(&[]), Err(ImageError::EmptyData)));
    assert!(matches!(
        decode_image_bytes(b"plain text, not pixels"),
        Err(ImageError::UnsupportedFormat)
    ));
    assert!(matches!(
        decode_base64_image("***"),
        Err(ImageError::InvalidBase64(_))
    ));

    let oversized = vec![0u8; MAX_IMAGE_SIZE + 1];
    assert!(matches!(
        decode_image_bytes(&oversized),
        Err(ImageError::TooLarge { .. })
    ));
}

#[test]
fn test_grayscale_is_replicated_across_channels() {
    let tensor = preprocess_for_classification(&grayscale(300, 200, 255));

    assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    // (1.0 - mean) / std per channel
    let expected = [
        (1.0 - 0.485) / 0.229,
        (1.0 - 0.456) / 0.224,
        (1.0 - 0.406) / 0.225,
    ];
    for (c, want) in expected.iter().enumerate() {
        assert!((tensor[[0, c, 100, 100]] - want).abs() < 1e-4);
    }
}
