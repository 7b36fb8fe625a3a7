//! Transport layer
//!
//! One request, one blocking round trip. `HttpTransport` POSTs the request to the
//! instrument; tests plug in their own `Transport`.

use std::time::Duration;

use serde_json::Value;

use crate::protocol::Request;

/// Sends a request and returns the decoded JSON body of the reply
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Value, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    url: String,
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport for `url`. With `timeout` set to `None` a request may block
    /// indefinitely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connection(e.to_string())
                } else {
                    TransportError::Http(e)
                }
            })?;

        // the status code is not checked: the firmware reports failures in the body
        Ok(response.json::<Value>()?)
    }
}
