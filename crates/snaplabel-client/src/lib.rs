#![warn(missing_docs)]
//! # snaplabel-client
//!
//! ## Purpose
//! Issues one label detection request per encoded image and resolves it into
//! a typed [`LabelResult`].
//!
//! ## Responsibilities
//! - Validate the service endpoint (HTTPS, loopback HTTP for local servers).
//! - Build the request body and send it through an injectable
//!   [`LabelTransport`].
//! - Classify transport errors, HTTP status, and body contents.
//! - Deliver the outcome to a completion callback exactly once, inline or
//!   from a worker thread.
//!
//! ## Data flow
//! [`EncodedPayload`] -> [`LabelRequestClient::resolve`] -> transport ->
//! status/body classification -> [`LabelResult`] -> callback.
//!
//! ## Error model
//! Construction errors return [`LabelClientError`]. Request-time failures are
//! never returned as `Err`; they become [`LabelResult::Failed`] so every call
//! has exactly one outcome. There is no automatic retry.
//!
//! ## Security and privacy notes
//! The API key lives only inside [`HttpLabelTransport`] and is never logged.
//! Transport errors are stripped of their URL before being reported.

mod http;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use snaplabel_core::EncodedPayload;
use snaplabel_vision_contract::{
    ACCEPTANCE_THRESHOLD, DEFAULT_MAX_RESULTS, FailureReason, LabelResult, build_label_request,
    interpret_response_body,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub use http::HttpLabelTransport;

/// Outbound request handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelHttpRequest {
    /// Validated service endpoint, without credentials.
    pub endpoint: Url,
    /// JSON request body.
    pub body: String,
}

/// Raw response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Abstract transport used by [`LabelRequestClient`].
pub trait LabelTransport: Send + Sync {
    /// Sends one request. Implementations must not retry.
    fn send(&self, request: &LabelHttpRequest) -> Result<TransportResponse, TransportError>;
}

/// Connection-level failures reported by transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection could not be established or was interrupted.
    #[error("connection failure: {0}")]
    Connection(String),
}

/// Per-request settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    /// Upper bound on labels requested from the service.
    pub max_results: u32,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Client that issues label requests and classifies responses.
#[derive(Clone)]
pub struct LabelRequestClient {
    endpoint: Url,
    config: RequestConfig,
    transport: Arc<dyn LabelTransport>,
}

impl LabelRequestClient {
    /// Creates a validated client.
    ///
    /// # Errors
    /// Returns [`LabelClientError::InvalidEndpoint`] when the endpoint does
    /// not satisfy [`validate_endpoint`], and
    /// [`LabelClientError::InvalidConfig`] when `max_results == 0`.
    pub fn new(
        endpoint: &str,
        config: RequestConfig,
        transport: Arc<dyn LabelTransport>,
    ) -> Result<Self, LabelClientError> {
        let endpoint = validate_endpoint(endpoint)?;
        if config.max_results == 0 {
            return Err(LabelClientError::InvalidConfig(
                "max_results must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            config,
            transport,
        })
    }

    /// Returns configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one request and classifies the outcome.
    ///
    /// Issues exactly one transport call, except when the request body cannot
    /// be serialized, in which case nothing is sent.
    pub fn resolve(&self, payload: &EncodedPayload) -> LabelResult {
        let request = build_label_request(payload.to_base64(), self.config.max_results);
        let body = match serde_json::to_string(&request) {
            Ok(body) => body,
            Err(error) => {
                return LabelResult::Failed(FailureReason::Encoding(format!(
                    "request body serialization failed: {error}"
                )));
            }
        };

        info!(
            stage = "label_request",
            action = "issued",
            payload_bytes = payload.len(),
            max_results = self.config.max_results,
        );

        let outcome = self.transport.send(&LabelHttpRequest {
            endpoint: self.endpoint.clone(),
            body,
        });
        let result = classify_transport_outcome(outcome, ACCEPTANCE_THRESHOLD);

        match &result {
            LabelResult::Failed(reason) => warn!(
                stage = "label_request",
                action = "resolved",
                outcome = result.outcome_class(),
                %reason,
            ),
            _ => info!(
                stage = "label_request",
                action = "resolved",
                outcome = result.outcome_class(),
                top_label = result.top_label().map(|label| label.text.as_str()),
            ),
        }

        result
    }

    /// Resolves `payload` on the calling thread and invokes `callback` once.
    pub fn request_labels<F>(&self, payload: EncodedPayload, callback: F)
    where
        F: FnOnce(LabelResult),
    {
        callback(self.resolve(&payload));
    }

    /// Resolves `payload` on a worker thread and invokes `callback` once from
    /// that thread.
    ///
    /// If the worker cannot be spawned, `callback` runs on the calling thread
    /// with [`FailureReason::Transport`]. A panic inside the transport is
    /// caught on the worker and reported the same way.
    pub fn request_labels_in_background<F>(&self, payload: EncodedPayload, callback: F)
    where
        F: FnOnce(LabelResult) + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(callback)));
        let worker_slot = Arc::clone(&slot);
        let client = self.clone();

        let spawned = thread::Builder::new()
            .name("snaplabel-label-request".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| client.resolve(&payload)))
                    .unwrap_or_else(|_| {
                        warn!(stage = "label_request", action = "worker_panicked");
                        LabelResult::Failed(FailureReason::Transport(
                            "label request worker panicked".to_string(),
                        ))
                    });
                deliver_once(&worker_slot, result);
            });

        if let Err(error) = spawned {
            deliver_once(
                &slot,
                LabelResult::Failed(FailureReason::Transport(format!(
                    "failed to spawn label request worker: {error}"
                ))),
            );
        }
    }
}

fn deliver_once<F>(slot: &Mutex<Option<F>>, result: LabelResult)
where
    F: FnOnce(LabelResult),
{
    let callback = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(callback) = callback {
        callback(result);
    }
}

/// Maps a transport outcome onto a [`LabelResult`].
///
/// # Semantics
/// - transport error -> `Failed(Timeout | Transport)`
/// - non-2xx status -> `Failed(HttpStatus)`
/// - 2xx -> body parsing and threshold classification
pub fn classify_transport_outcome(
    outcome: Result<TransportResponse, TransportError>,
    threshold: f32,
) -> LabelResult {
    match outcome {
        Err(TransportError::Timeout) => LabelResult::Failed(FailureReason::Timeout),
        Err(TransportError::Connection(message)) => {
            LabelResult::Failed(FailureReason::Transport(message))
        }
        Ok(response) if !(200..300).contains(&response.status) => {
            LabelResult::Failed(FailureReason::HttpStatus(response.status))
        }
        Ok(response) => interpret_response_body(&response.body, threshold),
    }
}

/// Validates the service endpoint.
///
/// HTTPS is required. Plain HTTP is accepted only for loopback hosts.
///
/// # Errors
/// Returns [`LabelClientError::InvalidEndpoint`] for unparsable URLs or
/// disallowed schemes.
pub fn validate_endpoint(endpoint: &str) -> Result<Url, LabelClientError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| LabelClientError::InvalidEndpoint(format!("invalid url: {error}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback(&parsed) => Ok(parsed),
        _ => Err(LabelClientError::InvalidEndpoint(
            "label endpoint must use https".to_string(),
        )),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// Client construction errors.
#[derive(Debug, Error)]
pub enum LabelClientError {
    /// Endpoint violates security or format requirements.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request configuration is unusable.
    #[error("invalid request config: {0}")]
    InvalidConfig(String),
    /// HTTP transport could not be built.
    #[error("http transport setup failed: {0}")]
    TransportSetup(String),
}
