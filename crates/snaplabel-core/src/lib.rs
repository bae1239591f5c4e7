#![warn(missing_docs)]
//! # snaplabel-core
//!
//! ## Purpose
//! Defines the captured-image data model and the image encoder used across
//! the `snaplabel` workspace.
//!
//! ## Responsibilities
//! - Represent validated raw captures ([`CapturedImage`]).
//! - Encode captures into immutable JPEG payloads ([`EncodedPayload`]) at a
//!   fixed quality.
//! - Render payloads as base64 for transport.
//!
//! ## Data flow
//! Capture backends emit [`CapturedImage`] values. The coordinator calls
//! [`encode`] once per capture and hands the resulting [`EncodedPayload`] to
//! the label request client.
//!
//! ## Ownership and lifetimes
//! Images and payloads own their buffers (`Vec<u8>`). A payload never borrows
//! from the capture it was produced from, so the capture can be dropped as
//! soon as it is no longer needed for history persistence.
//!
//! ## Error model
//! Bad input (empty buffer, shape mismatch, out-of-range quality) and codec
//! failures return [`EncodingError`] variants.
//!
//! ## Example
//! ```rust
//! use snaplabel_core::{encode, CapturedImage, REQUEST_JPEG_QUALITY};
//!
//! let image = CapturedImage::new(2, 2, 1.0, vec![200; 16]).expect("valid capture");
//! let first = encode(&image, REQUEST_JPEG_QUALITY).expect("encodes");
//! let second = encode(&image, REQUEST_JPEG_QUALITY).expect("encodes");
//! assert_eq!(first, second);
//! ```

use base64::Engine as _;
use thiserror::Error;

/// Quality used for images sent to the labeling service.
pub const REQUEST_JPEG_QUALITY: f32 = 0.8;

/// Quality used for images stored in local history.
pub const HISTORY_JPEG_QUALITY: f32 = 1.0;

/// One raw capture from the camera collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Device scale factor reported by the capture source.
    pub scale: f32,
    /// Raw RGBA pixel buffer (`width * height * 4` bytes).
    pub rgba: Vec<u8>,
}

impl CapturedImage {
    /// Constructs a validated capture.
    ///
    /// # Errors
    /// Returns [`EncodingError::EmptyImage`] for zero-sized images,
    /// [`EncodingError::InvalidShape`] when the buffer length is not exactly
    /// `width * height * 4`, and [`EncodingError::InvalidScale`] when `scale`
    /// is not a finite positive number.
    pub fn new(width: u32, height: u32, scale: f32, rgba: Vec<u8>) -> Result<Self, EncodingError> {
        if width == 0 || height == 0 || rgba.is_empty() {
            return Err(EncodingError::EmptyImage);
        }

        let expected = required_rgba_len(width, height)?;
        if rgba.len() != expected {
            return Err(EncodingError::InvalidShape {
                expected,
                actual: rgba.len(),
            });
        }

        if !scale.is_finite() || scale <= 0.0 {
            return Err(EncodingError::InvalidScale(scale));
        }

        Ok(Self {
            width,
            height,
            scale,
            rgba,
        })
    }

    /// Returns `true` when the capture carries no pixels.
    pub fn is_empty(&self) -> bool {
        self.rgba.is_empty() || self.width == 0 || self.height == 0
    }
}

/// Immutable JPEG bytes produced by [`encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPayload {
    jpeg: Vec<u8>,
    quality: f32,
    width: u32,
    height: u32,
}

impl EncodedPayload {
    /// Returns encoded JPEG bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    /// Consumes the payload and returns its JPEG bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.jpeg
    }

    /// Returns the standard base64 rendering used on the wire.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
    }

    /// Returns the quality this payload was encoded with.
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Returns source image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns encoded byte length.
    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    /// Returns `true` when no bytes were produced.
    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

/// Encodes a capture as JPEG at the given quality.
///
/// # Parameters
/// - `quality`: finite value in `(0, 1]`, mapped onto JPEG quality `1..=100`.
///
/// # Semantics
/// Output is deterministic for a given image and quality. The alpha channel
/// is dropped before encoding.
///
/// # Errors
/// Returns [`EncodingError::EmptyImage`], [`EncodingError::InvalidQuality`],
/// [`EncodingError::InvalidShape`] or [`EncodingError::Codec`].
pub fn encode(image: &CapturedImage, quality: f32) -> Result<EncodedPayload, EncodingError> {
    if image.is_empty() {
        return Err(EncodingError::EmptyImage);
    }
    let jpeg_quality = jpeg_quality(quality)?;

    // Fields are public, so geometry is re-checked here rather than trusted.
    let expected = required_rgba_len(image.width, image.height)?;
    if image.rgba.len() != expected {
        return Err(EncodingError::InvalidShape {
            expected,
            actual: image.rgba.len(),
        });
    }
    let rgb = rgba_to_rgb(&image.rgba);

    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality)
        .encode(
            &rgb,
            image.width,
            image.height,
            image::ColorType::Rgb8.into(),
        )
        .map_err(|error| EncodingError::Codec(error.to_string()))?;

    Ok(EncodedPayload {
        jpeg,
        quality,
        width: image.width,
        height: image.height,
    })
}

fn jpeg_quality(quality: f32) -> Result<u8, EncodingError> {
    if !quality.is_finite() || quality <= 0.0 || quality > 1.0 {
        return Err(EncodingError::InvalidQuality(quality));
    }

    Ok((quality * 100.0).round().clamp(1.0, 100.0) as u8)
}

fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((rgba.len() / 4) * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}

fn required_rgba_len(width: u32, height: u32) -> Result<usize, EncodingError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(EncodingError::Overflow)
}

/// Error type for capture validation and encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    /// Image has no pixels.
    #[error("image buffer is empty")]
    EmptyImage,
    /// Buffer length does not match declared geometry.
    #[error("invalid image shape: expected {expected} bytes, got {actual}")]
    InvalidShape {
        /// Expected RGBA byte count.
        expected: usize,
        /// Actual RGBA byte count.
        actual: usize,
    },
    /// Scale factor is not a finite positive number.
    #[error("invalid scale factor: {0}")]
    InvalidScale(f32),
    /// Quality is outside `(0, 1]`.
    #[error("invalid encoding quality {0}: must be in (0, 1]")]
    InvalidQuality(f32),
    /// Image dimensions overflow the addressable buffer size.
    #[error("image dimension overflow")]
    Overflow,
    /// JPEG codec failure.
    #[error("jpeg encoding failed: {0}")]
    Codec(String),
}
