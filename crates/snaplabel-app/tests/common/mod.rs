//! Shared fixtures for app integration tests.

use std::sync::{Arc, Mutex};

use snaplabel_app::CaptureCoordinator;
use snaplabel_capture::{CaptureBackend, CaptureCallback, CaptureError, PhotoSettings};
use snaplabel_client::{
    LabelHttpRequest, LabelRequestClient, LabelTransport, RequestConfig, TransportError,
    TransportResponse,
};
use snaplabel_core::CapturedImage;
use snaplabel_history::{HistoryStore, KeyValueStore, MemoryKeyValueStore, StorageError};
use snaplabel_ui::UiEvent;

/// Ten labels, highest score 0.92.
#[allow(dead_code)]
pub const TEN_LABEL_BODY: &str = r#"{"responses":[{"labelAnnotations":[
    {"description":"Cup","score":0.92},
    {"description":"Coffee cup","score":0.88},
    {"description":"Tableware","score":0.81},
    {"description":"Drinkware","score":0.77},
    {"description":"Serveware","score":0.66},
    {"description":"Ceramic","score":0.61},
    {"description":"Porcelain","score":0.55},
    {"description":"Saucer","score":0.52},
    {"description":"Mug","score":0.51},
    {"description":"Dishware","score":0.50}
]}]}"#;

/// Labels that are all below the acceptance threshold.
#[allow(dead_code)]
pub const LOW_CONFIDENCE_BODY: &str =
    r#"{"responses":[{"labelAnnotations":[{"description":"Blur","score":0.41}]}]}"#;

/// Camera whose captures complete only when the test says so.
#[derive(Default)]
pub struct ManualCamera {
    pending: Mutex<Vec<CaptureCallback>>,
    requests: Mutex<usize>,
}

#[allow(dead_code)]
impl ManualCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `capture_photo` calls so far.
    pub fn capture_requests(&self) -> usize {
        *self.requests.lock().expect("request counter lock")
    }

    /// Completes the oldest outstanding capture.
    pub fn complete(&self, result: Result<CapturedImage, CaptureError>) {
        let callback = {
            let mut pending = self.pending.lock().expect("pending lock");
            assert!(!pending.is_empty(), "no capture is outstanding");
            pending.remove(0)
        };
        callback(result);
    }
}

impl CaptureBackend for ManualCamera {
    fn start_session(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop_session(&self) {}

    fn capture_photo(&self, _settings: &PhotoSettings, on_complete: CaptureCallback) {
        *self.requests.lock().expect("request counter lock") += 1;
        self.pending.lock().expect("pending lock").push(on_complete);
    }
}

/// Transport returning one scripted outcome.
pub struct ScriptedTransport {
    outcome: Result<TransportResponse, TransportError>,
    calls: Mutex<usize>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn ok(body: &str) -> Arc<Self> {
        Self::with_outcome(Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        }))
    }

    pub fn failing(error: TransportError) -> Arc<Self> {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<TransportResponse, TransportError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("call counter lock")
    }
}

impl LabelTransport for ScriptedTransport {
    fn send(&self, _request: &LabelHttpRequest) -> Result<TransportResponse, TransportError> {
        *self.calls.lock().expect("call counter lock") += 1;
        self.outcome.clone()
    }
}

/// Medium that can read but never write.
#[derive(Default)]
pub struct ReadOnlyMedium;

impl KeyValueStore for ReadOnlyMedium {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Write("medium is read-only".to_string()))
    }
}

/// Coordinator plus the collaborators tests inspect.
#[allow(dead_code)]
pub struct Harness {
    pub coordinator: CaptureCoordinator,
    pub camera: Arc<ManualCamera>,
    pub transport: Arc<ScriptedTransport>,
    pub history: HistoryStore,
    pub events: Arc<Mutex<Vec<UiEvent>>>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(transport: Arc<ScriptedTransport>) -> Self {
        Self::with_medium(transport, Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_medium(
        transport: Arc<ScriptedTransport>,
        medium: Arc<dyn KeyValueStore>,
    ) -> Self {
        let camera = ManualCamera::new();
        let client = LabelRequestClient::new(
            "https://vision.example.test/v1/images:annotate",
            RequestConfig::default(),
            transport.clone(),
        )
        .expect("client should build");
        let history = HistoryStore::new(medium);
        let mut coordinator = CaptureCoordinator::new(camera.clone(), client, history.clone());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        coordinator.register_handler(move |event| {
            sink.lock().expect("event lock").push(event.clone());
        });

        Self {
            coordinator,
            camera,
            transport,
            history,
            events,
        }
    }

    pub fn emitted(&self) -> Vec<UiEvent> {
        self.events.lock().expect("event lock").clone()
    }
}

/// Small valid capture.
#[allow(dead_code)]
pub fn fixture_image() -> CapturedImage {
    CapturedImage::new(4, 4, 2.0, vec![90; 64]).expect("fixture image should be valid")
}
