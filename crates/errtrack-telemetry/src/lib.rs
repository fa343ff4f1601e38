//! errtrack Telemetry - Report assembly for the fault pipeline
//!
//! Provides:
//! - `Sanitizer`: Redaction of sensitive headers, body fields and stack arguments
//! - `PayloadBuilder`: Sanitized `ReportRecord` construction
//! - `ProcessHost` / `StaticHost`: Environment name and runtime metadata

pub mod payload;
pub mod sanitizer;
pub mod system_info;

pub use payload::PayloadBuilder;
pub use sanitizer::{Sanitizer, REDACTION_MARKER};
pub use system_info::{ProcessHost, StaticHost};
