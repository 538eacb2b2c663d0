//! Usage report job
//!
//! Counts customers and orders, then totals order amounts. Revenue is
//! summed with exact decimal arithmetic.

use crmsync_core::Amount;
use crmsync_core::domain::job::{JobItem, Outcome};
use crmsync_core::remote::{RemoteOperation, RemoteResponse, ShapeError};
use serde::Deserialize;

use super::{JobDefinition, count_field, list_nodes, response_at};

const COUNTS_QUERY: &str = "query UsageCounts { \
    customerCount: allCustomers { totalCount } \
    orderCount: allOrders { totalCount } \
}";

const AMOUNTS_QUERY: &str = "query OrderAmounts { \
    orders: allOrders { edges { node { amount: totalAmount } } } \
}";

#[derive(Debug, Deserialize)]
struct OrderAmount {
    amount: Amount,
}

/// Aggregate customer/order/revenue report
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageReport;

impl JobDefinition for UsageReport {
    fn name(&self) -> &str {
        "usage-report"
    }

    fn operation_count(&self) -> usize {
        2
    }

    fn next_operation(&self, prior: &[RemoteResponse]) -> Option<RemoteOperation> {
        match prior.len() {
            0 => Some(
                RemoteOperation::query("aggregate-counts", COUNTS_QUERY)
                    .expect_field("customerCount")
                    .expect_field("orderCount")
                    .root_field("allCustomers")
                    .root_field("allOrders"),
            ),
            1 => Some(
                RemoteOperation::query("order-amounts", AMOUNTS_QUERY)
                    .expect_field("orders")
                    .root_field("allOrders"),
            ),
            _ => None,
        }
    }

    fn interpret(&self, responses: &[RemoteResponse]) -> Result<Outcome, ShapeError> {
        let counts = response_at(responses, 0, 2)?;
        let amounts = response_at(responses, 1, 2)?;

        let customers = count_field(counts, "customerCount")?;
        let orders = count_field(counts, "orderCount")?;

        // A report with a wrong total is worse than no report, so any bad
        // amount fails the whole run.
        let amounts = list_nodes(amounts, "orders")?
            .into_iter()
            .enumerate()
            .map(|(idx, node)| {
                serde_json::from_value::<OrderAmount>(node)
                    .map(|order| order.amount)
                    .map_err(|e| ShapeError::unexpected(format!("orders/{}/amount", idx), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let revenue = Amount::sum(amounts).map_err(|e| ShapeError::unexpected("orders", e))?;

        let summary = format!(
            "Report: {} customers, {} orders, {} revenue",
            customers, orders, revenue
        );
        let items = vec![
            JobItem::Metric {
                name: "customers".to_string(),
                value: customers.to_string(),
            },
            JobItem::Metric {
                name: "orders".to_string(),
                value: orders.to_string(),
            },
            JobItem::Metric {
                name: "revenue".to_string(),
                value: revenue.to_string(),
            },
        ];

        Ok(Outcome::success(summary, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsync_core::domain::job::JobStatus;
    use serde_json::{Value as JsonValue, json};

    fn response(value: JsonValue) -> RemoteResponse {
        RemoteResponse::from_value(value).unwrap()
    }

    fn counts() -> RemoteResponse {
        response(json!({
            "customerCount": {"totalCount": 5},
            "orderCount": {"totalCount": 3}
        }))
    }

    #[test]
    fn test_two_operations_in_order() {
        let first = UsageReport.next_operation(&[]).unwrap();
        assert_eq!(first.name(), "aggregate-counts");

        let second = UsageReport.next_operation(&[counts()]).unwrap();
        assert_eq!(second.name(), "order-amounts");

        assert!(
            UsageReport
                .next_operation(&[counts(), response(json!({}))])
                .is_none()
        );
    }

    #[test]
    fn test_revenue_is_exact() {
        let amounts = response(json!({
            "orders": {"edges": [
                {"node": {"amount": "10.00"}},
                {"node": {"amount": "20.50"}}
            ]}
        }));

        let outcome = UsageReport.interpret(&[counts(), amounts]).unwrap();

        assert_eq!(outcome.status, JobStatus::Success);
        assert_eq!(
            outcome.summary,
            "Report: 5 customers, 3 orders, 30.50 revenue"
        );
        assert_eq!(
            outcome.items[2],
            JobItem::Metric {
                name: "revenue".to_string(),
                value: "30.50".to_string()
            }
        );
    }

    #[test]
    fn test_flat_counts_and_amounts_are_accepted() {
        let counts = response(json!({"customerCount": 5, "orderCount": 3}));
        let amounts = response(json!({"orders": [{"amount": "0.10"}, {"amount": "0.20"}]}));

        let outcome = UsageReport.interpret(&[counts, amounts]).unwrap();

        assert_eq!(
            outcome.summary,
            "Report: 5 customers, 3 orders, 0.30 revenue"
        );
    }

    #[test]
    fn test_no_orders_reports_zero_revenue() {
        let amounts = response(json!({"orders": {"edges": []}}));
        let outcome = UsageReport.interpret(&[counts(), amounts]).unwrap();
        assert!(outcome.summary.ends_with("0 revenue"));
    }

    #[test]
    fn test_bad_amount_fails_the_report() {
        let amounts = response(json!({
            "orders": {"edges": [{"node": {"amount": "10.00"}}, {"node": {"amount": "n/a"}}]}
        }));
        let err = UsageReport.interpret(&[counts(), amounts]).unwrap_err();
        assert!(matches!(err, ShapeError::UnexpectedType { ref path, .. } if path == "orders/1/amount"));
    }

    #[test]
    fn test_missing_second_response_is_shape_error() {
        let err = UsageReport.interpret(&[counts()]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingResponse {
                expected: 2,
                actual: 1
            }
        );
    }
}
