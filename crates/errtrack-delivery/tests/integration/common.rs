//! Shared test helpers for delivery integration tests
//!
//! Provides a sample report record and a DeliveryClient pointed at a
//! wiremock collection endpoint.

use errtrack_core::config::{ConfigBuilder, TrackerConfig};
use errtrack_core::domain::{RequestData, ReportRecord, SystemData};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errtrack_delivery::client::DeliveryClient;

pub const TEST_API_KEY: &str = "test-api-key";

/// Configuration with the given attempt budget and a 1 second timeout.
pub fn test_config(retry: u32) -> TrackerConfig {
    ConfigBuilder::new()
        .api_key(TEST_API_KEY)
        .app_id("app-test-001")
        .retry(retry)
        .timeout_secs(1)
        .build()
}

/// A minimal record as produced by the payload builder.
pub fn sample_record() -> ReportRecord {
    ReportRecord {
        application_id: "app-test-001".to_string(),
        exception_type: "app::DatabaseError".to_string(),
        message: "connection pool exhausted".to_string(),
        file: Some("src/db.rs".to_string()),
        line: Some(88),
        stack_trace: Vec::new(),
        request_data: RequestData {
            url: "https://app.test/checkout".to_string(),
            method: "POST".to_string(),
            ..RequestData::default()
        },
        user_data: None,
        system_data: SystemData {
            runtime_version: "rust linux-x86_64".to_string(),
            framework_version: None,
            server: None,
        },
        environment: "production".to_string(),
        occurred_at: "2026-01-15T10:00:00+00:00".to_string(),
    }
}

/// Starts a mock server and returns a client posting to it.
pub async fn setup_collector(retry: u32) -> (MockServer, DeliveryClient) {
    let server = MockServer::start().await;
    let client = DeliveryClient::with_base_url(&test_config(retry), server.uri())
        .expect("client construction failed");
    (server, client)
}

/// Mounts a collection endpoint answering every request with `status`.
pub async fn mount_status(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/errors"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}
