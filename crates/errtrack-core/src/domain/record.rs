//! Wire payload posted to the collection endpoint
//!
//! Field names are part of the collection API contract and must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::Headers;

/// A sanitized fault report, serialized as the JSON request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub application_id: String,
    pub exception_type: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub stack_trace: Vec<FrameRecord>,
    pub request_data: RequestData,
    pub user_data: Option<UserData>,
    pub system_data: SystemData,
    pub environment: String,
    /// ISO-8601 timestamp with explicit UTC offset
    pub occurred_at: String,
}

/// A sanitized stack frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Source file, or `[internal function]` for native frames
    pub file: String,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "type")]
    pub call_type: Option<String>,
    /// Placeholder-only argument values
    pub args: Option<Value>,
}

/// Sanitized request snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    pub url: String,
    pub method: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub headers: Headers,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
}

/// Identity of the authenticated principal, restricted to three fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Runtime and server metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemData {
    pub runtime_version: String,
    pub framework_version: Option<String>,
    pub server: Option<String>,
}

/// Top-level keys every serialized record carries
pub const REQUIRED_KEYS: &[&str] = &[
    "application_id",
    "exception_type",
    "message",
    "file",
    "line",
    "stack_trace",
    "request_data",
    "user_data",
    "system_data",
    "environment",
    "occurred_at",
];

impl ReportRecord {
    /// Serialize the record to the JSON request body
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
