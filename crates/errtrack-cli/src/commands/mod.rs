//! Subcommands of the `errtrack` CLI
//!
//! Also holds the synthetic fault and request used by `preview` and `test`,
//! so both commands exercise the same sanitization paths.

pub mod config;
pub mod preview;
pub mod test_fault;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use errtrack_core::config::TrackerConfig;
use errtrack_core::domain::{
    ArgValue, AuthenticatedUser, CallType, FaultEvent, FaultKind, FrameArgs, Headers, Origin,
    RequestContext, StackFrame,
};
use serde_json::json;

/// Kind given to synthetic faults unless overridden with `--kind`
pub const SAMPLE_KIND: &str = "runtime";

/// Resolves the configuration file: `--config` if given, else the default path
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .unwrap_or_else(TrackerConfig::default_path)
}

/// Loads the effective configuration (file, defaults, then environment)
pub fn effective_config(path: &Path) -> TrackerConfig {
    TrackerConfig::load_from_env(path)
}

/// A fault carrying the kinds of data the sanitizer must reduce
pub fn sample_fault(kind: FaultKind, message: &str) -> FaultEvent {
    let mut named = BTreeMap::new();
    named.insert("order_id".to_string(), ArgValue::Int(1042));
    named.insert("items".to_string(), ArgValue::Collection(vec![ArgValue::Int(1)]));
    named.insert("gateway".to_string(), ArgValue::object("PaymentGateway"));

    FaultEvent::new(kind, message)
        .with_type_name("errtrack::SampleFault")
        .with_origin(Origin::new("src/checkout.rs", 88))
        .with_stack_trace(vec![
            StackFrame::new("charge")
                .at("src/checkout.rs", 88)
                .in_type("CheckoutService", CallType::Instance)
                .with_args(FrameArgs::Named(named)),
            StackFrame::new("open_ledger").with_args(FrameArgs::Positional(vec![
                ArgValue::resource("file"),
                ArgValue::from("ledger.csv"),
            ])),
            StackFrame::new("main").at("src/main.rs", 12),
        ])
}

/// A checkout request with credentials in headers, query and body
pub fn sample_request() -> RequestContext {
    let headers = Headers::new()
        .with("Authorization", "Bearer sample-token")
        .with("Cookie", "session=sample")
        .with("Accept", "application/json");

    let query = json!({ "page": 2, "api_token": "sample-token" });
    let body = json!({
        "password": "hunter2",
        "email": "buyer@example.com",
        "card": { "number": "4111111111111111", "cvv": "123", "holder": "J. Doe" },
    });

    RequestContext::new("POST", "https://shop.example.com/checkout?page=2")
        .with_client_ip("203.0.113.7")
        .with_user_agent("errtrack-cli")
        .with_headers(headers)
        .with_query(query.as_object().cloned().unwrap_or_default())
        .with_body(body.as_object().cloned().unwrap_or_default())
        .with_user(
            AuthenticatedUser::new("42")
                .with_email("buyer@example.com")
                .with_name("Sample Buyer")
                .with_attribute("password_hash", json!("$2y$10$sample")),
        )
}

/// Framework identification reported by the CLI's own host collector
pub fn framework_version() -> Option<String> {
    Some(format!("errtrack-cli {}", env!("CARGO_PKG_VERSION")))
}
