//! End-to-end tests of RemoteClient over real HTTP against a local axum server

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use crmsync_client::{RemoteClient, RemoteError, RetryPolicy};
use crmsync_core::remote::RemoteOperation;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Hits = Arc<AtomicUsize>;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/graphql", addr)
}

fn policy(timeout: Duration, retries: u32) -> RetryPolicy {
    RetryPolicy::new(timeout, retries).without_backoff()
}

fn recent_orders() -> RemoteOperation {
    RemoteOperation::query(
        "recent-orders",
        "query RecentOrders($sinceDate: DateTime!) { orders: allOrders(orderDate_Gte: $sinceDate) { edges { node { id } } } }",
    )
    .bind("sinceDate", "2024-05-01T00:00:00Z")
    .expect_field("orders")
}

async fn echo_orders(Json(body): Json<Value>) -> Json<Value> {
    // Reflect the bound variable so the test can see what was sent.
    let since = body["variables"]["sinceDate"].clone();
    Json(json!({
        "data": {
            "orders": {"edges": [{"node": {"id": since}}]}
        }
    }))
}

#[tokio::test]
async fn test_executes_query_with_variables() {
    let url = serve(Router::new().route("/graphql", post(echo_orders))).await;
    let client = RemoteClient::new(url, true).unwrap();

    let response = client
        .execute(&recent_orders(), &policy(Duration::from_secs(5), 3))
        .await
        .unwrap();

    assert_eq!(
        response.pointer("/orders/edges/0/node/id"),
        Some(&json!("2024-05-01T00:00:00Z"))
    );
}

async fn flaky(State(hits): State<Hits>) -> Response {
    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
        (StatusCode::INTERNAL_SERVER_ERROR, "database is restarting").into_response()
    } else {
        Json(json!({"data": {"orders": {"edges": []}}})).into_response()
    }
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let hits: Hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/graphql", post(flaky))
        .with_state(hits.clone());
    let url = serve(router).await;
    let client = RemoteClient::new(url, true).unwrap();

    let response = client
        .execute(&recent_orders(), &policy(Duration::from_secs(5), 3))
        .await;

    assert!(response.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

async fn rejecting(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "data": null,
        "errors": [{"message": "Variable '$sinceDate' got invalid value", "path": ["allOrders"]}]
    }))
}

#[tokio::test]
async fn test_graphql_errors_are_returned_without_retry() {
    let hits: Hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/graphql", post(rejecting))
        .with_state(hits.clone());
    let url = serve(router).await;
    let client = RemoteClient::new(url, true).unwrap();

    let err = client
        .execute(&recent_orders(), &policy(Duration::from_secs(5), 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::ApplicationError(ref m) if m.contains("invalid value")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

async fn slow(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({"data": {"orders": {"edges": []}}}))
}

#[tokio::test]
async fn test_slow_server_times_out_each_attempt() {
    let hits: Hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route("/graphql", post(slow))
        .with_state(hits.clone());
    let url = serve(router).await;
    let client = RemoteClient::new(url, true).unwrap();

    let err = client
        .execute(&recent_orders(), &policy(Duration::from_millis(50), 2))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RemoteError::Timeout {
            attempts: 2,
            timeout: Duration::from_millis(50),
        }
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    // Bind to learn a free port, then close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RemoteClient::new(format!("http://{}/graphql", addr), true).unwrap();

    let err = client
        .execute(&recent_orders(), &policy(Duration::from_secs(1), 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Unreachable { attempts: 3, .. }));
}
