//! Low-stock restock job
//!
//! Triggers the remote restock mutation (products with stock below 10)
//! and records which products were replenished. The mutation is
//! idempotent on the remote side: a second run with nothing low on stock
//! returns an empty list.

use crmsync_core::domain::job::{JobItem, Outcome};
use crmsync_core::remote::{RemoteOperation, RemoteResponse, ShapeError};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{JobDefinition, decode_records, list_nodes, response_at};

const RESTOCK_MUTATION: &str = "mutation RestockLowStock { \
    restock: updateLowStockProducts { \
        message \
        updated: updatedProducts { name stock } \
    } \
}";

#[derive(Debug, Deserialize)]
struct RestockedProduct {
    name: String,
    stock: i64,
}

/// Restocks every product below the remote stock threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct LowStockRestock;

impl JobDefinition for LowStockRestock {
    fn name(&self) -> &str {
        "low-stock-restock"
    }

    fn next_operation(&self, prior: &[RemoteResponse]) -> Option<RemoteOperation> {
        prior.is_empty().then(|| {
            RemoteOperation::mutation("restock-low-stock", RESTOCK_MUTATION)
                .expect_field("restock")
                .root_field("updateLowStockProducts")
        })
    }

    fn interpret(&self, responses: &[RemoteResponse]) -> Result<Outcome, ShapeError> {
        let response = response_at(responses, 0, 1)?;
        let payload = RemoteResponse::from_value(
            response
                .field("restock")
                .cloned()
                .ok_or_else(|| ShapeError::MissingField("restock".to_string()))?,
        )?;

        let message = match payload.field("message") {
            Some(JsonValue::String(message)) => message.clone(),
            Some(other) => {
                return Err(ShapeError::unexpected(
                    "restock/message",
                    format!("expected a string, got {}", other),
                ));
            }
            None => "No message returned".to_string(),
        };

        let nodes = if payload.field("updated").is_some() {
            list_nodes(&payload, "updated")?
        } else {
            Vec::new()
        };
        let (products, skipped) = decode_records::<RestockedProduct>(nodes);

        let items = products
            .into_iter()
            .map(|p| JobItem::Restocked {
                name: p.name,
                stock: p.stock,
            })
            .collect();

        if skipped > 0 {
            Ok(Outcome::partial(
                format!("{} ({} malformed record(s) skipped)", message, skipped),
                items,
            ))
        } else {
            Ok(Outcome::success(message, items))
        }
    }
}
