//! Integration tests for the retry budget

use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use errtrack_core::ports::AttemptFailure;
use errtrack_delivery::client::RETRY_DELAY;

use crate::common;

#[tokio::test]
async fn test_always_failing_endpoint_exhausts_budget() {
    let (server, client) = common::setup_collector(3).await;
    common::mount_status(&server, 500, 3).await;

    let started = Instant::now();
    let report = client.deliver(&common::sample_record()).await;
    let elapsed = started.elapsed();

    assert!(!report.delivered);
    assert_eq!(report.attempt_count(), 3);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.failure == Some(AttemptFailure::Status(500))));
    assert_eq!(
        report.attempts.iter().map(|a| a.number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    // Two pauses: between 1-2 and 2-3, none after the last attempt
    assert_eq!(report.backoff, RETRY_DELAY * 2);
    assert!(elapsed >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_success_on_second_attempt_stops_retrying() {
    let (server, client) = common::setup_collector(3).await;

    Mock::given(method("POST"))
        .and(path("/api/errors"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_status(&server, 200, 1).await;

    let report = client.deliver(&common::sample_record()).await;

    assert!(report.delivered);
    assert_eq!(report.attempt_count(), 2);
    assert_eq!(report.attempts[0].status, Some(503));
    assert_eq!(report.attempts[1].status, Some(200));
    assert!(report.attempts[1].failure.is_none());
    assert_eq!(report.backoff, RETRY_DELAY);
}

#[tokio::test]
async fn test_single_attempt_budget_never_sleeps() {
    let (server, client) = common::setup_collector(1).await;
    common::mount_status(&server, 500, 1).await;

    let report = client.deliver(&common::sample_record()).await;

    assert!(!report.delivered);
    assert_eq!(report.attempt_count(), 1);
    assert_eq!(report.backoff, Duration::ZERO);
}

#[tokio::test]
async fn test_zero_budget_makes_no_request() {
    let (server, client) = common::setup_collector(0).await;
    common::mount_status(&server, 200, 0).await;

    let report = client.deliver(&common::sample_record()).await;

    assert!(!report.delivered);
    assert_eq!(report.attempt_count(), 0);
    assert!(report.aborted.is_none());
}

#[tokio::test]
async fn test_client_error_status_is_retried() {
    let (server, client) = common::setup_collector(2).await;
    common::mount_status(&server, 401, 2).await;

    assert!(!client.deliver_ok(&common::sample_record()).await);
}
