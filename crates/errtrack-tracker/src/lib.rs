//! errtrack Tracker - Fault reporting facade
//!
//! The crate a host application depends on. [`ErrorTracker`] combines the
//! report policy, payload construction and delivery behind one call that
//! never fails, and [`hook`] wires it into panics and `Result` errors.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use errtrack_core::config::TrackerConfig;
//! use errtrack_core::ports::NoRequestContext;
//! use errtrack_telemetry::ProcessHost;
//! use errtrack_tracker::{install_panic_reporter, ErrorTracker};
//!
//! # fn main() -> Result<(), errtrack_delivery::DeliveryError> {
//! let config = Arc::new(TrackerConfig::load_from_env(&TrackerConfig::default_path()));
//! let host = Arc::new(ProcessHost::collect(None));
//! let tracker = Arc::new(ErrorTracker::from_config(config, host)?);
//! install_panic_reporter(tracker, Arc::new(NoRequestContext));
//! # Ok(())
//! # }
//! ```

pub mod hook;
pub mod tracker;

pub use hook::{fault_from_panic, install_panic_reporter, report_and_continue};
pub use tracker::{ErrorTracker, ReportOutcome};
