//! errtrack Core - Domain model, configuration and report policy
//!
//! This crate contains the pieces of the fault reporting pipeline that have
//! no I/O of their own:
//! - **Domain types** - `FaultEvent`, `RequestContext`, `ReportRecord`, `FaultKind`
//! - **Configuration** - `TrackerConfig`, loaded once and shared read-only
//! - **Policy** - `ReportPolicy`, the enable/environment/exclusion gate
//! - **Port definitions** - Traits the host and delivery adapters implement:
//!   `HostEnvironment`, `ContextSource`, `ReportSink`
//!
//! # Architecture
//!
//! Like the rest of the workspace this crate follows the ports & adapters
//! pattern. Nothing here reads ambient process state except
//! [`config::TrackerConfig::apply_env_overrides`], which takes the lookup as
//! a parameter.

pub mod config;
pub mod domain;
pub mod policy;
pub mod ports;
