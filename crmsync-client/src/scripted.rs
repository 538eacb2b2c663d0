//! In-memory transport that replays canned replies
//!
//! Test double for `Transport`, built only with the `testing` feature:
//! each call to `post` pops the next scripted outcome, and every request
//! is recorded for later inspection.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TransportError;
use crate::graphql::GraphQlRequest;
use crate::transport::{Transport, TransportReply};

/// A transport that answers from a script
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportReply, TransportError>>>,
    requests: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a 200 reply with the given `data` object
    pub fn reply_data(self, data: JsonValue) -> Self {
        self.reply(200, serde_json::json!({ "data": data }))
    }

    /// Queues a reply with an arbitrary status and JSON body
    pub fn reply(self, status: u16, body: JsonValue) -> Self {
        self.push(Ok(TransportReply {
            status,
            body: body.to_string(),
        }))
    }

    /// Queues a transport-level failure
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error))
    }

    /// Queues the same failure `times` times
    pub fn fail_times(self, error: TransportError, times: usize) -> Self {
        (0..times).fold(self, |transport, _| transport.fail(error.clone()))
    }

    fn push(self, outcome: Result<TransportReply, TransportError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Copies of all requests received so far
    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(
        &self,
        request: &GraphQlRequest,
        _timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        // An exhausted script behaves like a dead endpoint.
        next.unwrap_or_else(|| Err(TransportError::Connect("script exhausted".to_string())))
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }
}
