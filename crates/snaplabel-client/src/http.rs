//! Blocking HTTP transport for the labeling service.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::{LabelClientError, LabelHttpRequest, LabelTransport, TransportError, TransportResponse};

/// Sends label requests with `reqwest`, appending the API key as the `key`
/// query parameter.
pub struct HttpLabelTransport {
    client: Client,
    api_key: String,
}

impl HttpLabelTransport {
    /// Creates a transport with a bounded per-request timeout.
    ///
    /// # Errors
    /// Returns [`LabelClientError::InvalidConfig`] for a blank key or zero
    /// timeout, and [`LabelClientError::TransportSetup`] when the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LabelClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LabelClientError::InvalidConfig(
                "api key must be non-empty".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(LabelClientError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LabelClientError::TransportSetup(error.without_url().to_string()))?;

        Ok(Self { client, api_key })
    }
}

impl fmt::Debug for HttpLabelTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLabelTransport")
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl LabelTransport for HttpLabelTransport {
    fn send(&self, request: &LabelHttpRequest) -> Result<TransportResponse, TransportError> {
        let mut url = request.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.clone())
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;

        Ok(TransportResponse { status, body })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }
    // The URL carries the API key.
    TransportError::Connection(error.without_url().to_string())
}

#[cfg(test)]
mod tests {
    //! Unit tests for transport construction.

    use super::*;

    #[test]
    fn rejects_blank_key_and_zero_timeout() {
        assert!(HttpLabelTransport::new("  ", Duration::from_secs(1)).is_err());
        assert!(HttpLabelTransport::new("key", Duration::ZERO).is_err());
    }

    #[test]
    fn debug_output_hides_api_key() {
        let transport =
            HttpLabelTransport::new("secret-key", Duration::from_secs(1)).expect("transport");
        assert!(!format!("{transport:?}").contains("secret-key"));
    }
}
