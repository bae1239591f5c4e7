//! Tests deterministic JPEG encoding of captured images.

use snaplabel_core::{CapturedImage, HISTORY_JPEG_QUALITY, REQUEST_JPEG_QUALITY, encode};

fn gradient_image(width: u32, height: u32) -> CapturedImage {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            rgba.extend_from_slice(&[(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8, 255]);
        }
    }
    CapturedImage::new(width, height, 2.0, rgba).expect("gradient fixture should be valid")
}

#[test]
fn encoder_determinism_tests_same_input_yields_identical_bytes() {
    let image = gradient_image(16, 12);
    for quality in [0.1_f32, 0.5, REQUEST_JPEG_QUALITY, HISTORY_JPEG_QUALITY] {
        let first = encode(&image, quality).expect("encoding should succeed");
        let second = encode(&image, quality).expect("encoding should succeed");
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(first.quality(), quality);
    }
}

#[test]
fn encoder_determinism_tests_output_is_jpeg() {
    let payload = encode(&gradient_image(8, 8), REQUEST_JPEG_QUALITY).expect("encoding should succeed");
    assert!(!payload.is_empty());
    assert_eq!(&payload.as_bytes()[..2], &[0xFF, 0xD8]);
    assert_eq!(payload.dimensions(), (8, 8));
}

#[test]
fn encoder_determinism_tests_lower_quality_is_not_larger() {
    let image = gradient_image(32, 32);
    let low = encode(&image, 0.1).expect("encoding should succeed");
    let high = encode(&image, 1.0).expect("encoding should succeed");
    assert!(low.len() <= high.len());
}
