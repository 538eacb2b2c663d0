//! Transport layer
//!
//! A transport performs exactly one POST attempt. Retry, backoff and
//! response decoding live in `RemoteClient`, so any transport gets the same
//! policy.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::error::{RemoteError, TransportError};
use crate::graphql::GraphQlRequest;

/// Raw answer from the server: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Trait for sending one GraphQL request
///
/// Implement this trait to point the client at something other than a
/// real HTTP endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request, bounded by `timeout`
    async fn post(
        &self,
        request: &GraphQlRequest,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError>;

    /// Where requests go, for diagnostics
    fn endpoint(&self) -> &str;
}

/// HTTP implementation of Transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a new HTTP transport
    ///
    /// # Arguments
    /// * `endpoint` - Full GraphQL URL (e.g., "http://localhost:8000/graphql")
    /// * `verify_tls` - Whether to verify server certificates
    pub fn new(endpoint: impl Into<String>, verify_tls: bool) -> Result<Self, RemoteError> {
        let endpoint = endpoint.into();

        if !verify_tls {
            warn!(
                "TLS certificate verification is DISABLED for {}; responses can be forged by anyone on the network path",
                endpoint
            );
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| RemoteError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    /// Creates a transport around a preconfigured reqwest client
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        request: &GraphQlRequest,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportReply { status, body })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
