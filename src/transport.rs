//! HTTP transport used in live mode
//!
//! The engine only needs a GET that returns a status and a body. [`Transport`]
//! abstracts that call so graphs can be rendered against in-memory fixtures.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{RenderError, Result};

/// Default request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests for live rendering
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`. Connection-level failures are `RequestError`s; non-success
    /// statuses are returned as responses.
    async fn fetch(&self, url: &str) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client with a request timeout and an optional user agent
    pub fn with_options(timeout_secs: u64, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }

        let client = builder.build().map_err(|e| RenderError::RequestError {
            endpoint: String::new(),
            response: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<TransportResponse> {
        debug!(url, "GET");
        let request_error = |e: reqwest::Error| RenderError::RequestError {
            endpoint: url.to_string(),
            response: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_error)?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(TransportResponse::new(200, "{}").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(404, "not found").is_success());
    }

    #[tokio::test]
    async fn test_connection_failure_is_request_error() {
        let transport = HttpTransport::with_options(2, Some("render-graph-test")).unwrap();
        let err = transport.fetch("http://127.0.0.1:1/unreachable").await.unwrap_err();
        assert!(matches!(err, RenderError::RequestError { endpoint, .. } if endpoint.ends_with("/unreachable")));
    }
}
