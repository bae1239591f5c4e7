//! Shared fixtures for label client integration tests.

use std::sync::{Arc, Mutex};

use snaplabel_client::{
    LabelHttpRequest, LabelRequestClient, LabelTransport, RequestConfig, TransportError,
    TransportResponse,
};
use snaplabel_core::{CapturedImage, EncodedPayload, REQUEST_JPEG_QUALITY, encode};

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
pub const LOW_CONFIDENCE_BODY: &str = r#"{"responses":[{"labelAnnotations":[
    {"description":"Blur","score":0.41},
    {"description":"Darkness","score":0.33}
]}]}"#;

/// Parsed response without any labels.
#[allow(dead_code)]
pub const EMPTY_LABEL_BODY: &str = r#"{"responses":[{}]}"#;

/// Body that is not JSON.
#[allow(dead_code)]
pub const MALFORMED_BODY: &str = "<html>bad gateway</html>";

/// Transport returning one scripted outcome and recording every request.
#[derive(Debug)]
pub struct ScriptedTransport {
    outcome: Result<TransportResponse, TransportError>,
    pub requests: Mutex<Vec<LabelHttpRequest>>,
}

impl ScriptedTransport {
    #[allow(dead_code)]
    pub fn ok(body: &str) -> Arc<Self> {
        Self::with_outcome(Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        }))
    }

    #[allow(dead_code)]
    pub fn status(status: u16) -> Arc<Self> {
        Self::with_outcome(Ok(TransportResponse {
            status,
            body: String::new(),
        }))
    }

    #[allow(dead_code)]
    pub fn failing(error: TransportError) -> Arc<Self> {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<TransportResponse, TransportError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        })
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("request log lock").len()
    }
}

impl LabelTransport for ScriptedTransport {
    fn send(&self, request: &LabelHttpRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .expect("request log lock")
            .push(request.clone());
        self.outcome.clone()
    }
}

/// Builds a client over `transport` with default request settings.
#[allow(dead_code)]
pub fn client_with(transport: Arc<ScriptedTransport>) -> LabelRequestClient {
    LabelRequestClient::new(
        "https://vision.example.test/v1/images:annotate",
        RequestConfig::default(),
        transport,
    )
    .expect("client should build")
}

/// Deterministic encoded payload fixture.
#[allow(dead_code)]
pub fn fixture_payload() -> EncodedPayload {
    let image = CapturedImage::new(2, 2, 1.0, vec![128; 16]).expect("fixture image");
    encode(&image, REQUEST_JPEG_QUALITY).expect("fixture payload")
}
