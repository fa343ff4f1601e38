//! The panic hook is process-global, so it gets its own test binary with a
//! single test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use errtrack_core::config::ConfigBuilder;
use errtrack_core::domain::{Headers, RequestContext, SystemData};
use errtrack_core::ports::ContextSource;
use errtrack_delivery::DeliveryClient;
use errtrack_telemetry::StaticHost;
use errtrack_tracker::{install_panic_reporter, ErrorTracker};

static PREVIOUS_HOOK_CALLED: AtomicBool = AtomicBool::new(false);

struct CheckoutRequest;

impl ContextSource for CheckoutRequest {
    fn current_request(&self) -> RequestContext {
        RequestContext::new("GET", "https://shop.test/checkout")
            .with_headers(Headers::new().with("Cookie", "session=secret-cookie"))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panic_is_reported_and_previous_hook_runs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/errors"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(
        ConfigBuilder::new()
            .api_key("hook-key")
            .app_id("shop")
            .retry(1)
            .build(),
    );
    let client = DeliveryClient::with_base_url(&config, server.uri()).expect("client");
    let host = StaticHost::new("production", SystemData::default());
    let tracker = Arc::new(ErrorTracker::new(config, Arc::new(host), Arc::new(client)));

    std::panic::set_hook(Box::new(|_| {
        PREVIOUS_HOOK_CALLED.store(true, Ordering::SeqCst);
    }));
    install_panic_reporter(tracker, Arc::new(CheckoutRequest));

    let joined = tokio::task::spawn_blocking(|| {
        std::thread::spawn(|| panic!("cart total overflowed")).join()
    })
    .await
    .expect("blocking task");
    assert!(joined.is_err());

    let _ = std::panic::take_hook();
    assert!(PREVIOUS_HOOK_CALLED.load(Ordering::SeqCst));

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["exception_type"], "panic");
    assert_eq!(body["message"], "cart total overflowed");
    assert!(body["file"].as_str().unwrap().ends_with("panic_hook.rs"));
    assert_eq!(body["request_data"]["url"], "https://shop.test/checkout");
    assert_eq!(body["request_data"]["headers"]["cookie"][0], "[REDACTED]");
}
