//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the traits the reporting pipeline depends on but does not
//! implement itself.
//!
//! ## Ports Overview
//!
//! - [`HostEnvironment`] - Environment name and runtime/server metadata
//! - [`ContextSource`] - Current request and principal, for hooks that only
//!   receive the fault
//! - [`ReportSink`] - Transmission of a finished report (implemented by the
//!   delivery crate)

pub mod host;
pub mod sink;

pub use host::{ContextSource, HostEnvironment, NoRequestContext};
pub use sink::{AttemptFailure, AttemptRecord, DeliveryReport, ReportSink};
