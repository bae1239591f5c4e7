#![warn(missing_docs)]
//! # snaplabel-vision-contract
//!
//! ## Purpose
//! Defines the labeling service wire schema and the client-side outcome
//! classification.
//!
//! ## Responsibilities
//! - Build single-image `LABEL_DETECTION` request bodies.
//! - Parse annotate responses, tolerating missing optional fields.
//! - Classify parsed responses into [`LabelResult`] using a fixed local
//!   acceptance threshold.
//!
//! ## Data flow
//! Base64 image -> [`build_label_request`] -> transport -> raw body ->
//! [`interpret_response_body`] -> [`LabelResult`].
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs; nothing borrows from transient network
//! buffers.
//!
//! ## Error model
//! Parse failures surface as [`LabelContractError`] from
//! [`parse_label_response`]. [`interpret_response_body`] folds them into
//! [`LabelResult::Failed`] so that callers get exactly one outcome value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum confidence for a label to count as a recognition.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.70;

/// Feature type requested from the service.
pub const LABEL_DETECTION_FEATURE: &str = "LABEL_DETECTION";

/// Default number of labels requested per image.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Request body for the annotate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateRequest {
    /// Per-image requests. This client always sends exactly one.
    pub requests: Vec<ImageRequest>,
}

/// One image with its requested features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Image content.
    pub image: ImageContent,
    /// Requested detection features.
    pub features: Vec<Feature>,
}

/// Inline image content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Base64-encoded image bytes.
    pub content: String,
}

/// Detection feature selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Feature type, for example `LABEL_DETECTION`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Upper bound on returned annotations.
    pub max_results: u32,
}

/// Response body from the annotate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateResponse {
    /// Per-image responses, aligned with request order.
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

/// Annotations for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    /// Label annotations; absent when the service found nothing.
    #[serde(default)]
    pub label_annotations: Vec<LabelAnnotation>,
    /// Per-image error reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceStatus>,
}

/// One label annotation as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAnnotation {
    /// Human-readable label text.
    pub description: String,
    /// Confidence in `[0.0, 1.0]`.
    pub score: f32,
    /// Opaque knowledge-graph id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
}

/// Service-reported error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Numeric status code.
    #[serde(default)]
    pub code: i32,
    /// Diagnostic message.
    #[serde(default)]
    pub message: String,
}

/// Accepted label surfaced to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Label text.
    pub text: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

/// Why a labeling request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Connection-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Request exceeded the transport timeout.
    #[error("request timed out")]
    Timeout,
    /// Service answered with a non-2xx status.
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    /// Body could not be parsed as an annotate response.
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    /// Service reported a per-image error.
    #[error("service error: {0}")]
    Service(String),
    /// Capture could not be encoded, so no request was sent.
    #[error("image encoding failed: {0}")]
    Encoding(String),
}

/// Terminal outcome of one labeling request.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelResult {
    /// At least one label met the threshold. Labels are accepted ones only,
    /// highest confidence first.
    Succeeded(Vec<Label>),
    /// Response parsed but nothing met the threshold.
    SucceededUncertain,
    /// Request failed.
    Failed(FailureReason),
}

impl LabelResult {
    /// Returns the highest-confidence accepted label, if any.
    pub fn top_label(&self) -> Option<&Label> {
        match self {
            Self::Succeeded(labels) => labels.first(),
            _ => None,
        }
    }

    /// Short outcome class used in logs.
    pub fn outcome_class(&self) -> &'static str {
        match self {
            Self::Succeeded(_) => "succeeded",
            Self::SucceededUncertain => "uncertain",
            Self::Failed(_) => "failed",
        }
    }
}

/// Builds a single-image label detection request.
pub fn build_label_request(image_base64: impl Into<String>, max_results: u32) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![ImageRequest {
            image: ImageContent {
                content: image_base64.into(),
            },
            features: vec![Feature {
                kind: LABEL_DETECTION_FEATURE.to_string(),
                max_results,
            }],
        }],
    }
}

/// Parses raw JSON into an annotate response.
///
/// # Errors
/// Returns [`LabelContractError::Decode`] for invalid JSON and
/// [`LabelContractError::InvalidContract`] when no per-image response is
/// present.
pub fn parse_label_response(raw: &str) -> Result<AnnotateResponse, LabelContractError> {
    let parsed: AnnotateResponse = serde_json::from_str(raw).map_err(LabelContractError::Decode)?;

    if parsed.responses.is_empty() {
        return Err(LabelContractError::InvalidContract(
            "responses is empty".to_string(),
        ));
    }

    Ok(parsed)
}

/// Classifies the first per-image response against `threshold`.
pub fn classify_response(response: &AnnotateResponse, threshold: f32) -> LabelResult {
    let Some(first) = response.responses.first() else {
        return LabelResult::Failed(FailureReason::MalformedBody(
            "responses is empty".to_string(),
        ));
    };

    if let Some(status) = &first.error {
        return LabelResult::Failed(FailureReason::Service(format!(
            "{} (code {})",
            status.message, status.code
        )));
    }

    classify_labels(&first.label_annotations, threshold)
}

/// Filters annotations by `threshold` and orders accepted labels by
/// descending confidence. Equal scores keep service order.
pub fn classify_labels(annotations: &[LabelAnnotation], threshold: f32) -> LabelResult {
    let mut accepted: Vec<Label> = annotations
        .iter()
        .filter(|annotation| annotation.score.is_finite() && annotation.score >= threshold)
        .map(|annotation| Label {
            text: annotation.description.clone(),
            confidence: annotation.score,
        })
        .collect();

    if accepted.is_empty() {
        return LabelResult::SucceededUncertain;
    }

    accepted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    LabelResult::Succeeded(accepted)
}

/// Parses and classifies a 2xx response body in one step.
pub fn interpret_response_body(raw: &str, threshold: f32) -> LabelResult {
    match parse_label_response(raw) {
        Ok(response) => classify_response(&response, threshold),
        Err(error) => LabelResult::Failed(FailureReason::MalformedBody(error.to_string())),
    }
}

/// Label contract errors.
#[derive(Debug, Error)]
pub enum LabelContractError {
    /// JSON decode failure.
    #[error("label response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("label response contract violation: {0}")]
    InvalidContract(String),
}
