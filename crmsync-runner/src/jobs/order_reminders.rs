//! Order reminders job
//!
//! Lists orders placed within the last week so reminders can be sent to
//! the customers who placed them.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use crmsync_core::domain::job::{JobItem, Outcome};
use crmsync_core::remote::{RemoteOperation, RemoteResponse, ShapeError};
use serde::Deserialize;

use super::{JobDefinition, decode_records, list_nodes, response_at};

/// How far back "recent" reaches
pub const LOOKBACK_DAYS: i64 = 7;

const RECENT_ORDERS_QUERY: &str = "query RecentOrders($sinceDate: DateTime!) { \
    orders: allOrders(orderDate_Gte: $sinceDate) { \
        edges { node { id customer { contact: email } date: orderDate } } \
    } \
}";

#[derive(Debug, Deserialize)]
struct Customer {
    contact: String,
}

#[derive(Debug, Deserialize)]
struct RecentOrder {
    id: String,
    customer: Customer,
    date: String,
}

/// Reminders for orders placed since a cutoff
#[derive(Debug, Clone, Copy)]
pub struct OrderReminders {
    since: DateTime<Utc>,
}

impl OrderReminders {
    /// Covers the `LOOKBACK_DAYS` days before `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            since: now - TimeDelta::days(LOOKBACK_DAYS),
        }
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }
}

impl JobDefinition for OrderReminders {
    fn name(&self) -> &str {
        "order-reminders"
    }

    fn next_operation(&self, prior: &[RemoteResponse]) -> Option<RemoteOperation> {
        prior.is_empty().then(|| {
            RemoteOperation::query("recent-orders", RECENT_ORDERS_QUERY)
                .bind(
                    "sinceDate",
                    self.since.to_rfc3339_opts(SecondsFormat::Secs, true),
                )
                .expect_field("orders")
                .root_field("allOrders")
        })
    }

    fn interpret(&self, responses: &[RemoteResponse]) -> Result<Outcome, ShapeError> {
        let response = response_at(responses, 0, 1)?;
        let (orders, skipped) = decode_records::<RecentOrder>(list_nodes(response, "orders")?);

        let items: Vec<JobItem> = orders
            .into_iter()
            .map(|order| JobItem::Reminder {
                order_id: order.id,
                contact: order.customer.contact,
                date: order.date,
            })
            .collect();

        let summary = if items.is_empty() && skipped == 0 {
            "No recent orders found.".to_string()
        } else {
            format!("{} order reminder(s) processed", items.len())
        };

        if skipped > 0 {
            Ok(Outcome::partial(
                format!("{} ({} malformed record(s) skipped)", summary, skipped),
                items,
            ))
        } else {
            Ok(Outcome::success(summary, items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crmsync_core::domain::job::JobStatus;
    use serde_json::{Value as JsonValue, json};

    fn response(value: JsonValue) -> RemoteResponse {
        RemoteResponse::from_value(value).unwrap()
    }

    fn job() -> OrderReminders {
        OrderReminders::new(Utc.with_ymd_and_hms(2024, 5, 8, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_query_binds_cutoff_seven_days_back() {
        let op = job().next_operation(&[]).unwrap();
        assert_eq!(
            op.variables().get("sinceDate"),
            Some(&json!("2024-05-01T09:00:00Z"))
        );
        assert_eq!(op.expected_fields(), ["orders"]);
    }

    #[test]
    fn test_one_reminder_per_order() {
        let outcome = job()
            .interpret(&[response(json!({
                "orders": {"edges": [
                    {"node": {"id": "1", "customer": {"contact": "alice@example.com"}, "date": "2024-05-02T10:00:00+00:00"}},
                    {"node": {"id": "2", "customer": {"contact": "bob@example.com"}, "date": "2024-05-07T16:30:00+00:00"}}
                ]}
            }))])
            .unwrap();

        assert_eq!(outcome.status, JobStatus::Success);
        assert_eq!(outcome.summary, "2 order reminder(s) processed");
        assert_eq!(
            outcome.items[1],
            JobItem::Reminder {
                order_id: "2".to_string(),
                contact: "bob@example.com".to_string(),
                date: "2024-05-07T16:30:00+00:00".to_string(),
            }
        );
    }

    #[test]
    fn test_flat_order_list_is_accepted() {
        let outcome = job()
            .interpret(&[response(json!({
                "orders": [{"id": "7", "customer": {"contact": "c@example.com"}, "date": "2024-05-03"}]
            }))])
            .unwrap();
        assert_eq!(outcome.items.len(), 1);
    }

    #[test]
    fn test_zero_orders_is_success_not_failure() {
        let outcome = job()
            .interpret(&[response(json!({"orders": {"edges": []}}))])
            .unwrap();
        assert_eq!(outcome.status, JobStatus::Success);
        assert_eq!(outcome.summary, "No recent orders found.");
        assert!(outcome.items.is_empty());
    }

    #[test]
    fn test_order_without_customer_is_skipped() {
        let outcome = job()
            .interpret(&[response(json!({
                "orders": {"edges": [
                    {"node": {"id": "1", "customer": null, "date": "2024-05-02"}},
                    {"node": {"id": "2", "customer": {"contact": "bob@example.com"}, "date": "2024-05-07"}}
                ]}
            }))])
            .unwrap();
        assert_eq!(outcome.status, JobStatus::PartialFailure);
        assert_eq!(outcome.items.len(), 1);
    }

    #[test]
    fn test_missing_orders_field_is_shape_error() {
        let err = job().interpret(&[response(json!({"orders": null}))]).unwrap_err();
        assert_eq!(err, ShapeError::MissingField("orders".to_string()));
    }
}
