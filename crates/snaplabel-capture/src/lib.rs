#![warn(missing_docs)]
//! # snaplabel-capture
//!
//! ## Purpose
//! Provides the camera collaborator abstraction consumed by the capture
//! coordinator.
//!
//! ## Responsibilities
//! - Define a backend-agnostic capture trait with session control and a
//!   one-shot photo callback.
//! - Expose a deterministic synthetic backend for CI and unit tests.
//! - Expose a file-backed backend that decodes a still image from disk.
//!
//! ## Data flow
//! Coordinator starts a session -> requests one photo with [`PhotoSettings`]
//! -> backend delivers `Result<CapturedImage, CaptureError>` to the callback.
//!
//! ## Ownership and lifetimes
//! Captured images are owned values; no borrowed frame memory escapes backend
//! boundaries. Callbacks are `Send + 'static` so backends may complete on any
//! thread.
//!
//! ## Error model
//! Session misuse and backend failures are delivered as [`CaptureError`]
//! through the callback, never panicked.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use snaplabel_core::CapturedImage;
use thiserror::Error;

/// One-shot completion callback for [`CaptureBackend::capture_photo`].
pub type CaptureCallback = Box<dyn FnOnce(Result<CapturedImage, CaptureError>) + Send + 'static>;

/// Flash behavior requested for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    /// Never fire.
    Off,
    /// Always fire.
    On,
    /// Let the device decide.
    #[default]
    Auto,
}

/// Per-capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    /// Request still-image stabilization.
    pub auto_still_image_stabilization: bool,
    /// Request the highest available resolution.
    pub high_resolution: bool,
    /// Flash behavior.
    pub flash: FlashMode,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            auto_still_image_stabilization: true,
            high_resolution: true,
            flash: FlashMode::Auto,
        }
    }
}

/// Trait implemented by camera providers.
pub trait CaptureBackend: Send + Sync {
    /// Starts the capture session.
    ///
    /// # Errors
    /// Returns [`CaptureError::Backend`] when the device cannot be opened.
    fn start_session(&self) -> Result<(), CaptureError>;

    /// Stops the capture session. Stopping an idle session is a no-op.
    fn stop_session(&self);

    /// Requests one photo. `on_complete` must be invoked exactly once.
    fn capture_photo(&self, settings: &PhotoSettings, on_complete: CaptureCallback);
}

/// Deterministic synthetic backend for test and CI usage.
///
/// Every capture yields a solid-color image whose byte value advances with
/// each call.
#[derive(Debug)]
pub struct SyntheticCaptureBackend {
    width: u32,
    height: u32,
    running: AtomicBool,
    sequence: Mutex<u64>,
}

impl SyntheticCaptureBackend {
    /// Creates a synthetic backend producing 4x4 captures.
    pub fn new() -> Self {
        Self::with_dimensions(4, 4)
    }

    /// Creates a synthetic backend with caller-provided capture dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            running: AtomicBool::new(false),
            sequence: Mutex::new(0),
        }
    }

    /// Returns the number of photos captured so far.
    pub fn captured_count(&self) -> u64 {
        self.sequence.lock().map(|sequence| *sequence).unwrap_or(0)
    }

    fn next_image(&self) -> Result<CapturedImage, CaptureError> {
        let mut sequence = self
            .sequence
            .lock()
            .map_err(|_| CaptureError::Backend("synthetic sequence lock poisoned".to_string()))?;
        *sequence += 1;

        let byte = (*sequence % 255) as u8;
        let rgba_len = (self.width as usize) * (self.height as usize) * 4;
        CapturedImage::new(self.width, self.height, 1.0, vec![byte; rgba_len])
            .map_err(|error| CaptureError::InvalidImage(error.to_string()))
    }
}

impl Default for SyntheticCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SyntheticCaptureBackend {
    fn start_session(&self) -> Result<(), CaptureError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_session(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn capture_photo(&self, _settings: &PhotoSettings, on_complete: CaptureCallback) {
        if !self.running.load(Ordering::SeqCst) {
            on_complete(Err(CaptureError::SessionNotRunning));
            return;
        }
        on_complete(self.next_image());
    }
}

/// Backend that "photographs" a still image file.
///
/// The file is decoded on every capture, so replacing it between captures
/// yields a different photo.
#[derive(Debug)]
pub struct FileCaptureBackend {
    path: PathBuf,
    running: AtomicBool,
}

impl FileCaptureBackend {
    /// Creates a backend reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            running: AtomicBool::new(false),
        }
    }

    /// Returns the source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureBackend for FileCaptureBackend {
    fn start_session(&self) -> Result<(), CaptureError> {
        if !self.path.is_file() {
            return Err(CaptureError::Backend(format!(
                "image source '{}' is not a readable file",
                self.path.display()
            )));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_session(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn capture_photo(&self, _settings: &PhotoSettings, on_complete: CaptureCallback) {
        if !self.running.load(Ordering::SeqCst) {
            on_complete(Err(CaptureError::SessionNotRunning));
            return;
        }
        on_complete(decode_image_file(&self.path));
    }
}

/// Decodes an image file into an RGBA capture with scale factor `1.0`.
///
/// # Errors
/// Returns [`CaptureError::Backend`] when the file cannot be read or decoded
/// and [`CaptureError::InvalidImage`] when it decodes to zero pixels.
pub fn decode_image_file(path: &Path) -> Result<CapturedImage, CaptureError> {
    let decoded = image::open(path).map_err(|error| {
        CaptureError::Backend(format!("decoding '{}' failed: {error}", path.display()))
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    CapturedImage::new(width, height, 1.0, rgba.into_raw())
        .map_err(|error| CaptureError::InvalidImage(error.to_string()))
}

/// Capture layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// A photo was requested before the session was started.
    #[error("capture session is not running")]
    SessionNotRunning,
    /// Backend produced an image that failed validation.
    #[error("captured image is invalid: {0}")]
    InvalidImage(String),
    /// Backend runtime failure.
    #[error("capture backend failure: {0}")]
    Backend(String),
}
