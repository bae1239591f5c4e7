#![warn(missing_docs)]
//! # snaplabel-ui
//!
//! ## Purpose
//! Defines the presentation-facing events and state model for `snaplabel`.
//!
//! ## Responsibilities
//! - Enumerate the typed events the capture coordinator emits.
//! - Reduce events into a [`UiState`] a shell can render.
//! - Project events into user-facing alert text.
//!
//! ## Data flow
//! Coordinator emits [`UiEvent`] -> registered handler calls
//! [`UiState::apply_event`] -> shell renders `busy`, alerts, and labels.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.

use snaplabel_vision_contract::{FailureReason, Label};

/// Event emitted once per capture cycle by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Labels came back but none was confident enough.
    ObjectUnidentified,
    /// The labeling request (or encoding for it) failed.
    RequestFailed(FailureReason),
    /// Accepted labels, highest confidence first.
    LabelsReady(Vec<Label>),
    /// The camera could not produce a photo.
    HardwareError(String),
}

/// User-facing alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub message: String,
}

impl Alert {
    fn new(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Returns the alert shown for `event`, or `None` when the event is
/// presented without an alert.
pub fn alert_for(event: &UiEvent) -> Option<Alert> {
    match event {
        UiEvent::ObjectUnidentified => Some(Alert::new(
            "Couldn't Identify Object",
            "Please take another photo.",
        )),
        UiEvent::RequestFailed(_) => Some(Alert::new(
            "Request Failed",
            "Please check your internet connection and try again.",
        )),
        UiEvent::HardwareError(reason) => Some(Alert::new("Camera Error", reason.clone())),
        UiEvent::LabelsReady(_) => None,
    }
}

/// Aggregate presentation state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiState {
    /// Capture indicator is showing.
    pub busy: bool,
    /// Most recent alert, if the last cycle produced one.
    pub last_alert: Option<Alert>,
    /// Labels from the most recent successful cycle.
    pub last_labels: Vec<Label>,
    /// Number of cycles that reached a terminal event.
    pub completed_cycles: u64,
}

impl UiState {
    /// Creates idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a capture as started (shows the activity indicator).
    pub fn begin_capture(&mut self) {
        self.busy = true;
        self.last_alert = None;
    }

    /// Applies one terminal event.
    pub fn apply_event(&mut self, event: &UiEvent) {
        self.busy = false;
        self.completed_cycles = self.completed_cycles.saturating_add(1);
        self.last_alert = alert_for(event);

        if let UiEvent::LabelsReady(labels) = event {
            self.last_labels = labels.clone();
        }
    }

    /// Text of the best label from the most recent success.
    pub fn headline(&self) -> Option<&str> {
        self.last_labels.first().map(|label| label.text.as_str())
    }
}
