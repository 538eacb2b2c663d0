//! Best-effort schema introspection
//!
//! Fetches the names of the root query and mutation fields once so that
//! operations selecting a field the server does not know about can be
//! flagged before they fail. Nothing here ever blocks execution.

use crmsync_core::remote::{OperationKind, RemoteOperation};
use serde::Deserialize;
use std::collections::HashSet;

pub(crate) const INTROSPECTION_QUERY: &str = "query IntrospectRootFields { \
    __schema { \
        queryType { fields { name } } \
        mutationType { fields { name } } \
    } \
}";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaData {
    #[serde(rename = "__schema")]
    schema: Schema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Schema {
    query_type: Option<RootType>,
    mutation_type: Option<RootType>,
}

#[derive(Debug, Deserialize)]
struct RootType {
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Field {
    name: String,
}

/// Root field names known to the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFields {
    pub queries: HashSet<String>,
    pub mutations: HashSet<String>,
}

impl SchemaFields {
    /// Parses the `data` object of an introspection response
    pub(crate) fn from_data(data: serde_json::Value) -> Result<Self, serde_json::Error> {
        let parsed: SchemaData = serde_json::from_value(data)?;
        let names = |root: Option<RootType>| -> HashSet<String> {
            root.map(|r| r.fields.into_iter().map(|f| f.name).collect())
                .unwrap_or_default()
        };
        Ok(Self {
            queries: names(parsed.schema.query_type),
            mutations: names(parsed.schema.mutation_type),
        })
    }

    /// Root fields of `op` that the schema does not define
    pub fn unknown_fields<'a>(&self, op: &'a RemoteOperation) -> Vec<&'a str> {
        let known = match op.kind() {
            OperationKind::Query => &self.queries,
            OperationKind::Mutation => &self.mutations,
        };
        op.root_fields()
            .iter()
            .map(String::as_str)
            .filter(|field| !known.contains(*field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaFields {
        SchemaFields::from_data(json!({
            "__schema": {
                "queryType": {"fields": [{"name": "hello"}, {"name": "allOrders"}]},
                "mutationType": {"fields": [{"name": "updateLowStockProducts"}]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parses_root_fields() {
        let schema = schema();
        assert!(schema.queries.contains("hello"));
        assert!(schema.mutations.contains("updateLowStockProducts"));
    }

    #[test]
    fn test_missing_mutation_type_is_empty() {
        let schema = SchemaFields::from_data(json!({
            "__schema": {"queryType": {"fields": [{"name": "hello"}]}, "mutationType": null}
        }))
        .unwrap();
        assert!(schema.mutations.is_empty());
    }

    #[test]
    fn test_unknown_fields_respect_operation_kind() {
        let schema = schema();
        let query = RemoteOperation::query("q", "query { hello }").root_field("hello");
        assert!(schema.unknown_fields(&query).is_empty());

        // hello is a query field, not a mutation field
        let mutation = RemoteOperation::mutation("m", "mutation { hello }").root_field("hello");
        assert_eq!(schema.unknown_fields(&mutation), vec!["hello"]);
    }
}
