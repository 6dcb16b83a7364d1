use bankqa_logs::{
    ClientConfig, FetchError, FilterSet, HttpRecordFetcher, LoadStatus, LogSource, LogicalField,
    RecordFetcher, RecordReconciler,
};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fetcher_for(server: &MockServer, timeout_ms: u64) -> HttpRecordFetcher {
    HttpRecordFetcher::new(ClientConfig {
        base_url: server.base_url(),
        timeout_ms,
    })
    .expect("http client")
}

#[tokio::test]
async fn bare_array_and_wrapped_bodies_both_load() {
    let server = MockServer::start_async().await;
    let audit = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/audit-log");
            then.status(200).json_body(json!([
                {"id": 1, "customer_name": "Rahul", "action": "LOGIN"},
                {"id": 2, "username": "priya", "action": "TRANSFER"}
            ]));
        })
        .await;
    let operations = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/operation-flow");
            then.status(200).json_body(json!({
                "flows": [{"operation_name": "transfer", "status": "success"}],
                "data": []
            }));
        })
        .await;

    let fetcher = fetcher_for(&server, 2_000);
    let rows = fetcher.fetch(LogSource::Audit).await.expect("audit rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].resolve(LogicalField::CustomerName), "priya");

    let rows = fetcher.fetch(LogSource::Operation).await.expect("operation rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].resolve(LogicalField::OperationName), "transfer");

    audit.assert_async().await;
    operations.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_scoped_to_the_feed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/sessions");
            then.status(503).body("maintenance");
        })
        .await;

    let err = fetcher_for(&server, 2_000)
        .fetch(LogSource::Session)
        .await
        .expect_err("503 must fail");
    assert_eq!(
        err,
        FetchError::Status {
            feed: LogSource::Session,
            status: 503
        }
    );
    assert_eq!(err.to_string(), "HTTP 503: Failed to fetch Session Log");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/notifications");
            then.status(200)
                .delay(Duration::from_millis(400))
                .json_body(json!([]));
        })
        .await;

    let err = fetcher_for(&server, 50)
        .fetch(LogSource::Notification)
        .await
        .expect_err("should time out");
    assert!(
        matches!(err, FetchError::Timeout { feed: LogSource::Notification, .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/audit-log");
            then.status(200)
                .header("content-type", "application/json")
                .body("{not json");
        })
        .await;

    let err = fetcher_for(&server, 2_000)
        .fetch(LogSource::Audit)
        .await
        .expect_err("bad body");
    assert!(matches!(err, FetchError::Decode { .. }), "{err:?}");
}

#[tokio::test]
async fn reconciler_loads_all_feeds_and_isolates_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/audit-log");
            then.status(200).json_body(json!({"data": [
                {"customer_name": "Rahul", "action": "LOGIN", "timestamp": "2026-02-01 09:00:00"},
                {"customer_name": "Anil", "action": "DELETE", "timestamp": "2026-02-03 09:00:00"}
            ]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/operation-flow");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/sessions");
            then.status(200)
                .json_body(json!({"sessions": [{"session_token": "abcd1234efgh5678", "is_active": 1}]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/notifications");
            then.status(200).json_body(json!({"notifications": []}));
        })
        .await;

    let mut reconciler = RecordReconciler::new(Arc::new(fetcher_for(&server, 2_000)));
    reconciler.fetch_all(&LogSource::VARIANTS).await;

    assert_eq!(reconciler.view(LogSource::Audit).status, LoadStatus::Loaded);
    assert_eq!(reconciler.view(LogSource::Audit).records.len(), 2);
    assert!(matches!(
        reconciler.view(LogSource::Operation).status.error(),
        Some(FetchError::Status { status: 500, .. })
    ));
    assert_eq!(reconciler.view(LogSource::Session).records.len(), 1);
    let notifications = reconciler.view(LogSource::Notification);
    assert_eq!(notifications.status, LoadStatus::Loaded);
    assert!(notifications.records.is_empty());

    let mut filters = FilterSet::default();
    filters.date_range = bankqa_logs::DateRange::from_inputs(Some("2026-02-01"), Some("2026-02-01"));
    let rows = reconciler.filtered(LogSource::Audit, &filters);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].resolve(LogicalField::CustomerName), "Rahul");
}
