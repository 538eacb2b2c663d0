//! GraphQL wire format
//!
//! Request and response envelopes as exchanged over HTTP, plus the
//! decoding rules that turn a reply into a `RemoteResponse` or a
//! non-retryable `RemoteError`.

use crmsync_core::remote::{RemoteOperation, RemoteResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::RemoteError;
use crate::transport::TransportReply;

/// Longest body excerpt carried into error messages
const BODY_EXCERPT_LEN: usize = 200;

/// JSON body POSTed to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Map<String, JsonValue>,
    pub operation_name: Option<String>,
}

impl From<&RemoteOperation> for GraphQlRequest {
    fn from(op: &RemoteOperation) -> Self {
        Self {
            query: op.document().to_string(),
            variables: op.variables().clone(),
            operation_name: None,
        }
    }
}

/// JSON body returned by the endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<JsonValue>>,
}

impl std::fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => {
                let joined: Vec<String> = path
                    .iter()
                    .map(|segment| match segment {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{} (at {})", self.message, joined.join("."))
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body.to_string();
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Decodes a non-5xx reply for the given operation
///
/// Nothing decided here is retried: an answer that arrived is final.
pub(crate) fn decode_reply(
    op: &RemoteOperation,
    reply: TransportReply,
) -> Result<RemoteResponse, RemoteError> {
    let parsed = serde_json::from_str::<GraphQlResponse>(&reply.body);

    if !(200..300).contains(&reply.status) {
        let detail = match &parsed {
            Ok(GraphQlResponse {
                errors: Some(errors),
                ..
            }) if !errors.is_empty() => join_errors(errors),
            _ => excerpt(&reply.body),
        };
        return Err(RemoteError::ApplicationError(format!(
            "HTTP {}: {}",
            reply.status, detail
        )));
    }

    let parsed = parsed.map_err(|e| {
        RemoteError::MalformedResponse(format!("response body is not GraphQL JSON: {}", e))
    })?;

    if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
        return Err(RemoteError::ApplicationError(join_errors(&errors)));
    }

    let data = match parsed.data {
        Some(JsonValue::Null) | None => {
            return Err(RemoteError::MalformedResponse(format!(
                "operation '{}' returned no data",
                op.name()
            )));
        }
        Some(data) => data,
    };

    let response = RemoteResponse::from_value(data)
        .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;

    if let Some(missing) = op
        .expected_fields()
        .iter()
        .find(|field| !response.data().contains_key(field.as_str()))
    {
        return Err(RemoteError::MalformedResponse(format!(
            "operation '{}' response is missing field '{}'",
            op.name(),
            missing
        )));
    }

    Ok(response)
}
