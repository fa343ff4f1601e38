//! Domain entities
//!
//! This module contains the core domain types for errtrack:
//! - Fault kinds and the subtype relation used by exclusion rules
//! - Fault events and their captured stack frames
//! - Request context snapshots supplied by the host
//! - The sanitized report record sent over the wire
//! - Domain-specific error types

pub mod errors;
pub mod fault;
pub mod kind;
pub mod record;
pub mod request;

// Re-export commonly used types
pub use errors::DomainError;
pub use fault::{parse_backtrace, ArgValue, CallType, FaultEvent, FrameArgs, Origin, StackFrame};
pub use kind::{DottedTaxonomy, FaultKind, FaultTaxonomy, TaxonomyMap};
pub use record::{FrameRecord, ReportRecord, RequestData, SystemData, UserData, REQUIRED_KEYS};
pub use request::{AuthenticatedUser, Headers, RequestContext};
