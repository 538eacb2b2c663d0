//! Remote operation descriptors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Whether an operation reads or writes on the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// A described query or mutation sent to the remote service
///
/// Built once when a job is defined and never mutated afterwards; the
/// builder methods consume `self`.
///
/// # Example
/// ```
/// use crmsync_core::remote::RemoteOperation;
///
/// let op = RemoteOperation::query("liveness", "query { liveness: hello }")
///     .expect_field("liveness");
/// assert_eq!(op.expected_fields(), ["liveness"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOperation {
    name: String,
    kind: OperationKind,
    document: String,
    variables: Map<String, JsonValue>,
    expected_fields: Vec<String>,
    root_fields: Vec<String>,
}

impl RemoteOperation {
    /// Creates a query operation
    pub fn query(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Query, document)
    }

    /// Creates a mutation operation
    pub fn mutation(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Mutation, document)
    }

    fn new(name: impl Into<String>, kind: OperationKind, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            document: document.into(),
            variables: Map::new(),
            expected_fields: Vec::new(),
            root_fields: Vec::new(),
        }
    }

    /// Binds a GraphQL variable
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Declares a top-level `data` field the response must contain
    pub fn expect_field(mut self, field: impl Into<String>) -> Self {
        self.expected_fields.push(field.into());
        self
    }

    /// Names a schema root field the document selects (before aliasing)
    pub fn root_field(mut self, field: impl Into<String>) -> Self {
        self.root_fields.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn variables(&self) -> &Map<String, JsonValue> {
        &self.variables
    }

    pub fn expected_fields(&self) -> &[String] {
        &self.expected_fields
    }

    pub fn root_fields(&self) -> &[String] {
        &self.root_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_bindings_and_fields() {
        let op = RemoteOperation::query("recent-orders", "query($since: DateTime!) { x }")
            .bind("since", "2024-01-01T00:00:00Z")
            .expect_field("orders")
            .expect_field("total")
            .root_field("allOrders");

        assert_eq!(op.name(), "recent-orders");
        assert_eq!(op.kind(), OperationKind::Query);
        assert_eq!(
            op.variables().get("since"),
            Some(&JsonValue::String("2024-01-01T00:00:00Z".to_string()))
        );
        assert_eq!(op.expected_fields(), ["orders", "total"]);
        assert_eq!(op.root_fields(), ["allOrders"]);
    }

    #[test]
    fn test_mutation_kind_display() {
        let op = RemoteOperation::mutation("restock", "mutation { x }");
        assert_eq!(op.kind().to_string(), "mutation");
    }
}
