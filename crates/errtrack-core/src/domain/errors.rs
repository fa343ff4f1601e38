//! Domain error types
//!
//! Errors raised while constructing domain values from untrusted input
//! (configuration files, host-supplied fault identifiers).

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Fault kind identifier is empty or malformed
    #[error("Invalid fault kind: {0}")]
    InvalidFaultKind(String),
}
