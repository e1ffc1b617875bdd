//! HTTP transport behind the Weaviate store.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use ureq::Agent;

/// A failed HTTP exchange.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Transport, status or decoding detail.
    pub message: String,
}

impl TransportError {
    /// Wraps any displayable failure.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Minimal HTTP client used by [`crate::WeaviateChunkStore`].
pub trait HttpTransport {
    /// Issues a `GET` and succeeds on any 2xx status.
    ///
    /// # Errors
    /// Returns [`TransportError`] on connection failure or a non-2xx status.
    fn get(&self, url: &str) -> Result<(), TransportError>;

    /// Posts `body` as JSON and decodes the JSON response.
    ///
    /// # Errors
    /// Returns [`TransportError`] on connection failure, a non-2xx status, or
    /// an undecodable body.
    fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError>;
}

/// [`HttpTransport`] backed by a blocking `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Creates a transport whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<(), TransportError> {
        self.agent
            .get(url)
            .call()
            .map(|_| ())
            .map_err(|error| TransportError::new(error.to_string()))
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let mut response = self
            .agent
            .post(url)
            .send_json(body)
            .map_err(|error| TransportError::new(error.to_string()))?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|error| TransportError::new(error.to_string()))
    }
}
