//! Decoded remote responses and shape errors

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// The response did not have the shape a job expected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("unexpected value at '{path}': {reason}")]
    UnexpectedType { path: String, reason: String },

    #[error("expected {expected} response(s), got {actual}")]
    MissingResponse { expected: usize, actual: usize },
}

impl ShapeError {
    pub fn unexpected(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnexpectedType {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// The `data` object returned by one remote operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteResponse {
    data: Map<String, JsonValue>,
}

impl RemoteResponse {
    pub fn new(data: Map<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Builds a response from a JSON value, which must be an object
    pub fn from_value(value: JsonValue) -> Result<Self, ShapeError> {
        match value {
            JsonValue::Object(data) => Ok(Self { data }),
            other => Err(ShapeError::unexpected(
                "data",
                format!("expected an object, got {}", type_name(&other)),
            )),
        }
    }

    pub fn data(&self) -> &Map<String, JsonValue> {
        &self.data
    }

    /// Returns a top-level field, treating JSON `null` as absent
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.data.get(name).filter(|value| !value.is_null())
    }

    /// Looks up a nested value with a JSON pointer such as `/orders/edges`
    pub fn pointer(&self, path: &str) -> Option<&JsonValue> {
        let (head, rest) = split_pointer(path);
        let value = self.data.get(head)?;
        let found = if rest.is_empty() {
            Some(value)
        } else {
            value.pointer(rest)
        };
        found.filter(|value| !value.is_null())
    }

    /// Decodes the value at a JSON pointer into a typed structure
    pub fn decode<T: DeserializeOwned>(&self, path: &str) -> Result<T, ShapeError> {
        let value = self
            .pointer(path)
            .ok_or_else(|| ShapeError::MissingField(path.to_string()))?;
        T::deserialize(value).map_err(|e| ShapeError::unexpected(path, e))
    }
}

fn split_pointer(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, ""),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
