//! Heartbeat job
//!
//! Confirms the CRM is alive and records what its `hello` field answered.

use crmsync_core::domain::job::Outcome;
use crmsync_core::remote::{RemoteOperation, RemoteResponse, ShapeError};
use serde_json::Value as JsonValue;

use super::JobDefinition;

const LIVENESS_QUERY: &str = "query Heartbeat { liveness: hello }";

/// Liveness check against the remote service
#[derive(Debug, Clone, Copy, Default)]
pub struct Heartbeat;

impl JobDefinition for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn next_operation(&self, prior: &[RemoteResponse]) -> Option<RemoteOperation> {
        prior.is_empty().then(|| {
            RemoteOperation::query("liveness", LIVENESS_QUERY)
                .expect_field("liveness")
                .root_field("hello")
        })
    }

    fn interpret(&self, responses: &[RemoteResponse]) -> Result<Outcome, ShapeError> {
        let answer = responses
            .first()
            .and_then(|r| r.field("liveness"))
            .map(|value| match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            });

        let summary = match answer {
            Some(answer) => format!("CRM is alive; GraphQL hello response: {}", answer),
            None => "CRM is alive; no response from GraphQL".to_string(),
        };

        Ok(Outcome::success(summary, Vec::new()))
    }
}
