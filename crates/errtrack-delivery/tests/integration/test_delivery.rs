//! Integration tests for request shape and single-attempt outcomes

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use errtrack_core::ports::{AttemptFailure, ReportSink};
use errtrack_delivery::client::DeliveryClient;

use crate::common;

#[tokio::test]
async fn test_deliver_posts_json_with_bearer_auth() {
    let (server, client) = common::setup_collector(3).await;

    Mock::given(method("POST"))
        .and(path("/api/errors"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client.deliver(&common::sample_record()).await;

    assert!(report.delivered);
    assert_eq!(report.attempt_count(), 1);
    assert_eq!(report.attempts[0].status, Some(201));
    assert_eq!(report.backoff, Duration::ZERO);

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("body is JSON");
    assert_eq!(body["application_id"], "app-test-001");
    assert_eq!(body["exception_type"], "app::DatabaseError");
    assert_eq!(body["request_data"]["method"], "POST");
    assert_eq!(body["occurred_at"], "2026-01-15T10:00:00+00:00");
    assert!(body["user_data"].is_null());
}

#[tokio::test]
async fn test_any_2xx_status_is_success() {
    for status in [200_u16, 202, 204, 299] {
        let (server, client) = common::setup_collector(3).await;
        common::mount_status(&server, status, 1).await;

        assert!(
            client.deliver_ok(&common::sample_record()).await,
            "status {status} should be accepted"
        );
    }
}

#[tokio::test]
async fn test_report_sink_submit_delegates_to_deliver() {
    let (server, client) = common::setup_collector(1).await;
    common::mount_status(&server, 200, 1).await;

    let sink: &dyn ReportSink = &client;
    let report = sink.submit(&common::sample_record()).await;

    assert!(report.delivered);
}

#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let (server, client) = common::setup_collector(1).await;

    Mock::given(method("POST"))
        .and(path("/api/errors"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let report = client.deliver(&common::sample_record()).await;

    assert!(!report.delivered);
    assert_eq!(report.attempt_count(), 1);
    assert_eq!(report.last_failure(), Some(&AttemptFailure::Timeout));
}

#[tokio::test]
async fn test_connection_refused_counts_as_failed_attempt() {
    // Reserve a port, then release it so nothing is listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };
    let client = DeliveryClient::with_base_url(
        &common::test_config(2),
        format!("http://127.0.0.1:{port}"),
    )
    .expect("client construction failed");

    let report = client.deliver(&common::sample_record()).await;

    assert!(!report.delivered);
    assert_eq!(report.attempt_count(), 2);
    assert!(matches!(
        report.last_failure(),
        Some(AttemptFailure::Transport(_))
    ));
    assert!(report.attempts.iter().all(|a| a.status.is_none()));
}
