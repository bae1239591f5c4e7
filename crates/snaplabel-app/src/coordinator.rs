//! Single-flight capture state machine.
//!
//! The coordinator owns one event queue. Camera and label callbacks never
//! touch coordinator state directly: they post a [`CoordinatorEvent`] and
//! the coordinator applies it in [`CaptureCoordinator::handle`] on the thread
//! that drives it. That queue is the only sequencing point, so two callbacks
//! can never interleave.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use snaplabel_capture::{CaptureBackend, CaptureError, PhotoSettings};
use snaplabel_client::LabelRequestClient;
use snaplabel_core::{CapturedImage, HISTORY_JPEG_QUALITY, REQUEST_JPEG_QUALITY, encode};
use snaplabel_history::HistoryStore;
use snaplabel_ui::UiEvent;
use snaplabel_vision_contract::{FailureReason, LabelResult};
use tracing::{debug, info, warn};

use crate::AppError;

/// Presentation callback receiving every emitted [`UiEvent`].
pub type UiEventHandler = Box<dyn FnMut(&UiEvent) + Send>;

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Ready for a trigger.
    Idle,
    /// Waiting for the camera callback.
    Capturing,
    /// Waiting for the label callback.
    AwaitingResult,
}

/// Input to the state machine.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// User asked for a photo.
    Trigger,
    /// Camera callback fired.
    PhotoCaptured(Result<CapturedImage, CaptureError>),
    /// Label callback fired.
    LabelsResolved(LabelResult),
}

impl CoordinatorEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::PhotoCaptured(Ok(_)) => "photo_captured",
            Self::PhotoCaptured(Err(_)) => "photo_failed",
            Self::LabelsResolved(_) => "labels_resolved",
        }
    }
}

/// Where label requests run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDispatch {
    /// On the coordinator thread, inside `handle`.
    #[default]
    Inline,
    /// On a worker thread per request.
    Background,
}

/// Drives one capture at a time from trigger to UI event.
pub struct CaptureCoordinator {
    state: CoordinatorState,
    camera: Arc<dyn CaptureBackend>,
    client: LabelRequestClient,
    history: HistoryStore,
    settings: PhotoSettings,
    dispatch: RequestDispatch,
    capture_enabled: bool,
    pending_history_image: Option<Vec<u8>>,
    handlers: Vec<UiEventHandler>,
    events_tx: Sender<CoordinatorEvent>,
    events_rx: Receiver<CoordinatorEvent>,
}

impl CaptureCoordinator {
    /// Creates an idle coordinator with default photo settings and inline
    /// request dispatch.
    pub fn new(
        camera: Arc<dyn CaptureBackend>,
        client: LabelRequestClient,
        history: HistoryStore,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state: CoordinatorState::Idle,
            camera,
            client,
            history,
            settings: PhotoSettings::default(),
            dispatch: RequestDispatch::default(),
            capture_enabled: true,
            pending_history_image: None,
            handlers: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    /// Sets where label requests run.
    pub fn with_dispatch(mut self, dispatch: RequestDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Sets the settings passed to every capture.
    pub fn with_photo_settings(mut self, settings: PhotoSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Enables or disables triggers (kill switch).
    pub fn set_capture_enabled(&mut self, enabled: bool) {
        self.capture_enabled = enabled;
    }

    /// Registers a presentation handler. Handlers run in registration order.
    pub fn register_handler<H>(&mut self, handler: H)
    where
        H: FnMut(&UiEvent) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Returns a sender other threads may use to post events, typically
    /// [`CoordinatorEvent::Trigger`].
    pub fn sender(&self) -> Sender<CoordinatorEvent> {
        self.events_tx.clone()
    }

    /// Returns current state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Returns the history store results are appended to.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Starts the camera session.
    ///
    /// # Errors
    /// Returns [`AppError::Capture`] when the backend refuses to start.
    pub fn start_session(&self) -> Result<(), AppError> {
        self.camera.start_session()?;
        info!(stage = "session", action = "start");
        Ok(())
    }

    /// Stops the camera session.
    pub fn stop_session(&self) {
        self.camera.stop_session();
        info!(stage = "session", action = "stop");
    }

    /// Applies [`CoordinatorEvent::Trigger`].
    ///
    /// # Errors
    /// Same as [`CaptureCoordinator::handle`].
    pub fn trigger(&mut self) -> Result<CoordinatorState, AppError> {
        self.handle(CoordinatorEvent::Trigger)
    }

    /// Applies queued events without blocking until the queue is empty.
    ///
    /// Returns the number of events handled. Stops at the first error; later
    /// events stay queued.
    ///
    /// # Errors
    /// Same as [`CaptureCoordinator::handle`].
    pub fn pump(&mut self) -> Result<usize, AppError> {
        let mut handled = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    handled += 1;
                    self.handle(event)?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(handled),
            }
        }
    }

    /// Blocks on the queue until the coordinator is back in
    /// [`CoordinatorState::Idle`].
    ///
    /// There is no timer here: the wait ends when the pending callback
    /// arrives. Request timeouts belong to the label transport.
    ///
    /// # Errors
    /// Same as [`CaptureCoordinator::handle`].
    pub fn run_until_idle(&mut self) -> Result<CoordinatorState, AppError> {
        while self.state != CoordinatorState::Idle {
            match self.events_rx.recv() {
                Ok(event) => {
                    self.handle(event)?;
                }
                // Unreachable while `self` owns a sender.
                Err(_) => break,
            }
        }
        Ok(self.state)
    }

    /// Applies one event and returns the resulting state.
    ///
    /// Events that do not fit the current state are ignored, including a
    /// trigger while a capture is in flight.
    ///
    /// # Errors
    /// - [`AppError::Encoding`] when the capture cannot be encoded. The cycle
    ///   has already ended with [`UiEvent::RequestFailed`].
    /// - [`AppError::Storage`] when the history append fails. The cycle has
    ///   already ended with [`UiEvent::LabelsReady`].
    pub fn handle(&mut self, event: CoordinatorEvent) -> Result<CoordinatorState, AppError> {
        match (self.state, event) {
            (CoordinatorState::Idle, CoordinatorEvent::Trigger) => {
                self.begin_capture();
                Ok(self.state)
            }
            (CoordinatorState::Capturing, CoordinatorEvent::PhotoCaptured(Ok(image))) => {
                self.submit_capture(image)
            }
            (CoordinatorState::Capturing, CoordinatorEvent::PhotoCaptured(Err(error))) => {
                warn!(stage = "capture", action = "hardware_error", %error);
                self.finish(UiEvent::HardwareError(error.to_string()));
                Ok(self.state)
            }
            (CoordinatorState::AwaitingResult, CoordinatorEvent::LabelsResolved(result)) => {
                self.complete(result)
            }
            (state, CoordinatorEvent::Trigger) => {
                debug!(stage = "capture", action = "trigger_ignored", ?state);
                Ok(state)
            }
            (state, event) => {
                warn!(
                    stage = "coordinator",
                    action = "event_ignored",
                    ?state,
                    event = event.kind(),
                );
                Ok(state)
            }
        }
    }

    fn begin_capture(&mut self) {
        if !self.capture_enabled {
            info!(stage = "capture", action = "trigger_blocked", "capture disabled by kill switch");
            return;
        }

        self.transition(CoordinatorState::Capturing);
        let events_tx = self.events_tx.clone();
        self.camera.capture_photo(
            &self.settings,
            Box::new(move |result| {
                let _ = events_tx.send(CoordinatorEvent::PhotoCaptured(result));
            }),
        );
    }

    fn submit_capture(&mut self, image: CapturedImage) -> Result<CoordinatorState, AppError> {
        let encoded = encode(&image, REQUEST_JPEG_QUALITY).and_then(|payload| {
            encode(&image, HISTORY_JPEG_QUALITY).map(|history| (payload, history.into_bytes()))
        });
        // The raw capture is not needed past this point.
        drop(image);

        let (payload, history_image) = match encoded {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(stage = "encode", action = "failed", %error);
                self.finish(UiEvent::RequestFailed(FailureReason::Encoding(
                    error.to_string(),
                )));
                return Err(AppError::Encoding(error));
            }
        };

        self.pending_history_image = Some(history_image);
        self.transition(CoordinatorState::AwaitingResult);

        let events_tx = self.events_tx.clone();
        let deliver = move |result: LabelResult| {
            let _ = events_tx.send(CoordinatorEvent::LabelsResolved(result));
        };
        match self.dispatch {
            RequestDispatch::Inline => self.client.request_labels(payload, deliver),
            RequestDispatch::Background => {
                self.client.request_labels_in_background(payload, deliver)
            }
        }

        Ok(self.state)
    }

    fn complete(&mut self, result: LabelResult) -> Result<CoordinatorState, AppError> {
        let history_image = self.pending_history_image.take();

        let labels = match result {
            LabelResult::Succeeded(labels) if !labels.is_empty() => labels,
            LabelResult::Succeeded(_) | LabelResult::SucceededUncertain => {
                self.finish(UiEvent::ObjectUnidentified);
                return Ok(self.state);
            }
            LabelResult::Failed(reason) => {
                self.finish(UiEvent::RequestFailed(reason));
                return Ok(self.state);
            }
        };

        let word = labels[0].text.clone();
        self.finish(UiEvent::LabelsReady(labels));

        let Some(image) = history_image else {
            warn!(stage = "history", action = "skipped", "no image pending for result");
            return Ok(self.state);
        };
        if let Err(error) = self.history.append(&word, image) {
            warn!(stage = "history", action = "append_failed", %error);
            return Err(AppError::Storage(error));
        }

        Ok(self.state)
    }

    fn finish(&mut self, event: UiEvent) {
        self.transition(CoordinatorState::Idle);
        for handler in &mut self.handlers {
            handler(&event);
        }
    }

    fn transition(&mut self, next: CoordinatorState) {
        debug!(stage = "coordinator", action = "transition", from = ?self.state, to = ?next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for ignored-event handling.

    use snaplabel_capture::SyntheticCaptureBackend;
    use snaplabel_client::{
        LabelHttpRequest, LabelTransport, RequestConfig, TransportError, TransportResponse,
    };
    use snaplabel_history::MemoryKeyValueStore;

    use super::*;

    struct UnreachableTransport;

    impl LabelTransport for UnreachableTransport {
        fn send(&self, _request: &LabelHttpRequest) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Connection("unreachable".to_string()))
        }
    }

    fn coordinator() -> CaptureCoordinator {
        let client = LabelRequestClient::new(
            "https://vision.example.test/annotate",
            RequestConfig::default(),
            Arc::new(UnreachableTransport),
        )
        .expect("client should build");
        CaptureCoordinator::new(
            Arc::new(SyntheticCaptureBackend::new()),
            client,
            HistoryStore::new(Arc::new(MemoryKeyValueStore::new())),
        )
    }

    #[test]
    fn stale_label_result_in_idle_is_ignored() {
        let mut coordinator = coordinator();
        let state = coordinator
            .handle(CoordinatorEvent::LabelsResolved(LabelResult::SucceededUncertain))
            .expect("ignored event is not an error");
        assert_eq!(state, CoordinatorState::Idle);
    }

    #[test]
    fn kill_switch_keeps_coordinator_idle() {
        let mut coordinator = coordinator();
        coordinator.set_capture_enabled(false);
        assert_eq!(coordinator.trigger().unwrap(), CoordinatorState::Idle);
        assert_eq!(coordinator.pump().unwrap(), 0);
    }
}
