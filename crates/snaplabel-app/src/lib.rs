#![warn(missing_docs)]
//! # snaplabel-app
//!
//! ## Purpose
//! Wires camera, encoder, label client, history, and presentation together
//! around the capture coordinator.
//!
//! ## Responsibilities
//! - Run the single-flight capture state machine ([`CaptureCoordinator`]).
//! - Load runtime configuration from the environment ([`AppConfig`]).
//! - Provide log redaction and the capture kill switch.
//! - Project coordinator and UI state into a flat status snapshot.
//!
//! ## Data flow
//! Trigger -> camera callback -> encode -> label request -> label callback ->
//! UI event (+ history append on success). Both callbacks only enqueue
//! events; the coordinator handles them in order on its own thread.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Outcome categories that
//! are part of normal operation (uncertain labels, failed requests, camera
//! errors) are reported as UI events rather than errors.
//!
//! ## Security and privacy notes
//! - The API key is only handed to the HTTP transport.
//! - [`redact_sensitive`] strips credential-like values before logging.

mod config;
mod coordinator;

use snaplabel_capture::CaptureError;
use snaplabel_client::LabelClientError;
use snaplabel_core::EncodingError;
use snaplabel_history::StorageError;
use snaplabel_ui::UiState;
use thiserror::Error;

pub use config::{AppConfig, DEFAULT_ENDPOINT, DEFAULT_HISTORY_DIR, DEFAULT_REQUEST_TIMEOUT_MS};
pub use coordinator::{
    CaptureCoordinator, CoordinatorEvent, CoordinatorState, RequestDispatch, UiEventHandler,
};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SNAPLABEL_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Flat status snapshot for simple shells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Whether a trigger would currently start a capture.
    pub capture_allowed: bool,
    /// Coordinator state name.
    pub coordinator: String,
    /// Activity indicator.
    pub busy: bool,
    /// Best label from the most recent success.
    pub headline: Option<String>,
    /// Most recent alert as `title: message`.
    pub alert: Option<String>,
}

/// Projects coordinator state and UI state into one snapshot.
pub fn project_runtime_status(
    coordinator_state: CoordinatorState,
    capture_enabled: bool,
    ui: &UiState,
) -> RuntimeStatus {
    RuntimeStatus {
        capture_allowed: capture_enabled && coordinator_state == CoordinatorState::Idle,
        coordinator: format!("{coordinator_state:?}"),
        busy: ui.busy,
        headline: ui.headline().map(str::to_string),
        alert: ui
            .last_alert
            .as_ref()
            .map(|alert| format!("{}: {}", alert.title, alert.message)),
    }
}

/// Redacts common secret markers in log-safe output.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in ["password", "token", "authorization", "bearer", "key"] {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    for separator in ['=', ':', ' '] {
        let marker = format!("{key}{separator}");
        if let Some(position) = lower.find(&marker) {
            let prefix = &input[..position];
            return format!("{prefix}{key}=<redacted>");
        }
    }

    input.to_string()
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera session could not be controlled.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Capture could not be encoded; the cycle was aborted.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    /// Label client could not be constructed.
    #[error("label client error: {0}")]
    Client(#[from] LabelClientError),
    /// History could not be read or written. The UI outcome already shown
    /// is not rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}
