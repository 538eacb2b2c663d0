//! crmsync Remote Client
//!
//! A small client for executing GraphQL operations against the CRM query
//! service with a bounded retry/timeout policy.
//!
//! The client separates three concerns:
//! - `Transport`: performs one POST attempt (reqwest in production)
//! - `RetryPolicy`: how many attempts, how long each may take, backoff
//! - `RemoteClient`: runs the attempts and decodes replies into
//!   `RemoteResponse` or a typed `RemoteError`
//!
//! # Example
//!
//! ```no_run
//! use crmsync_client::{RemoteClient, RetryPolicy};
//! use crmsync_core::remote::RemoteOperation;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), crmsync_client::RemoteError> {
//!     let client = RemoteClient::new("http://localhost:8000/graphql", true)?;
//!     let op = RemoteOperation::query("liveness", "query { liveness: hello }")
//!         .expect_field("liveness");
//!
//!     let response = client.execute(&op, &RetryPolicy::default()).await?;
//!     println!("{:?}", response.field("liveness"));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod graphql;
mod introspection;
pub mod policy;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod transport;

// Re-export commonly used types
pub use error::{RemoteError, Result, TransportError};
pub use introspection::SchemaFields;
pub use policy::RetryPolicy;
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedTransport;
pub use transport::{HttpTransport, Transport, TransportReply};

use crmsync_core::remote::{RemoteOperation, RemoteResponse};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::graphql::{GraphQlRequest, decode_reply};
use crate::introspection::INTROSPECTION_QUERY;

/// Client for the CRM query service
///
/// Holds no state between calls other than the optional introspection
/// cache. Each job run should use its own instance.
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    introspect: bool,
    schema: OnceCell<Option<SchemaFields>>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.transport.endpoint())
            .field("introspect", &self.introspect)
            .finish()
    }
}

impl RemoteClient {
    /// Create a client that talks HTTP to `endpoint`
    ///
    /// # Arguments
    /// * `endpoint` - The GraphQL URL (e.g., "http://localhost:8000/graphql")
    /// * `verify_tls` - Whether server certificates are verified
    pub fn new(endpoint: impl Into<String>, verify_tls: bool) -> Result<Self> {
        let transport = HttpTransport::new(endpoint, verify_tls)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            introspect: false,
            schema: OnceCell::new(),
        }
    }

    /// Enable or disable best-effort schema introspection
    pub fn with_introspection(mut self, enabled: bool) -> Self {
        self.introspect = enabled;
        self
    }

    /// Whether the first `execute` also fetches the remote schema
    pub fn introspects(&self) -> bool {
        self.introspect
    }

    /// Get the endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Execute one operation under `policy`
    ///
    /// Transport failures (connection errors, timeouts, 5xx) are retried up
    /// to `policy.max_attempts()` times. Anything the server actually
    /// answered (GraphQL errors, 4xx, malformed bodies) is returned
    /// immediately.
    pub async fn execute(
        &self,
        op: &RemoteOperation,
        policy: &RetryPolicy,
    ) -> Result<RemoteResponse> {
        if self.introspect {
            self.check_schema(op, policy).await;
        }

        let request = GraphQlRequest::from(op);
        let attempts = policy.max_attempts();
        let mut last_error = TransportError::Connect("no attempt made".to_string());

        for attempt in 1..=attempts {
            debug!(
                "Executing {} '{}' (attempt {}/{})",
                op.kind(),
                op.name(),
                attempt,
                attempts
            );

            match self.transport.post(&request, policy.timeout).await {
                Ok(reply) if reply.status >= 500 => {
                    last_error = TransportError::Server {
                        status: reply.status,
                        body: graphql::excerpt(&reply.body),
                    };
                }
                Ok(reply) => return decode_reply(op, reply),
                Err(e) => last_error = e,
            }

            if attempt < attempts {
                let delay = policy.backoff_after(attempt);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {:?}",
                    op.name(),
                    attempt,
                    attempts,
                    last_error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(match last_error {
            TransportError::Timeout => RemoteError::Timeout {
                attempts,
                timeout: policy.timeout,
            },
            other => RemoteError::Unreachable {
                attempts,
                last_error: other.to_string(),
            },
        })
    }

    /// Cached introspection result, fetched on first use
    ///
    /// `None` means the schema could not be fetched; that is cached too.
    pub async fn schema(&self, policy: &RetryPolicy) -> Option<&SchemaFields> {
        self.schema
            .get_or_init(|| self.fetch_schema(policy))
            .await
            .as_ref()
    }

    async fn fetch_schema(&self, policy: &RetryPolicy) -> Option<SchemaFields> {
        let request = GraphQlRequest {
            query: INTROSPECTION_QUERY.to_string(),
            variables: Default::default(),
            operation_name: None,
        };

        let reply = match self.transport.post(&request, policy.timeout).await {
            Ok(reply) if reply.status < 300 => reply,
            Ok(reply) => {
                debug!("Schema introspection returned status {}", reply.status);
                return None;
            }
            Err(e) => {
                debug!("Schema introspection failed: {}", e);
                return None;
            }
        };

        let data = serde_json::from_str::<graphql::GraphQlResponse>(&reply.body)
            .ok()
            .and_then(|parsed| parsed.data);

        match data.map(SchemaFields::from_data) {
            Some(Ok(schema)) => Some(schema),
            Some(Err(e)) => {
                debug!("Schema introspection response not understood: {}", e);
                None
            }
            None => {
                debug!("Schema introspection returned no data");
                None
            }
        }
    }

    async fn check_schema(&self, op: &RemoteOperation, policy: &RetryPolicy) {
        let Some(schema) = self.schema(policy).await else {
            return;
        };

        let unknown = schema.unknown_fields(op);
        if !unknown.is_empty() {
            warn!(
                "Operation '{}' selects {} root field(s) unknown to the remote {} type: {}",
                op.name(),
                unknown.len(),
                op.kind(),
                unknown.join(", ")
            );
        }
    }
}
