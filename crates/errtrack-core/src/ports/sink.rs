//! Report sink port (driven/secondary port)
//!
//! A sink takes a finished [`ReportRecord`] and transmits it. The sink
//! never fails from the caller's point of view: every failure mode is
//! folded into the returned [`DeliveryReport`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ReportRecord;

/// Why a single delivery attempt did not succeed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The endpoint answered with a status outside 200..300
    #[error("endpoint responded with status {0}")]
    Status(u16),

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Diagnostics for one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub number: u32,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Failure reason; `None` for the accepted attempt
    pub failure: Option<AttemptFailure>,
}

impl AttemptRecord {
    pub fn accepted(number: u32, status: u16) -> Self {
        Self {
            number,
            status: Some(status),
            failure: None,
        }
    }

    pub fn failed(number: u32, failure: AttemptFailure) -> Self {
        let status = match failure {
            AttemptFailure::Status(code) => Some(code),
            _ => None,
        };
        Self {
            number,
            status,
            failure: Some(failure),
        }
    }
}

/// Outcome of delivering one report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// True once an attempt was accepted by the endpoint
    pub delivered: bool,
    /// Every attempt made, in order
    pub attempts: Vec<AttemptRecord>,
    /// Total time spent waiting between attempts
    pub backoff: Duration,
    /// Set when delivery was abandoned before any attempt (e.g. encoding)
    pub aborted: Option<String>,
}

impl DeliveryReport {
    /// A report for a delivery abandoned before the first attempt
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            aborted: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// The failure of the most recent unsuccessful attempt
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.attempts.iter().rev().find_map(|a| a.failure.as_ref())
    }
}

/// Port trait for transmitting finished reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver the record, retrying as configured
    async fn submit(&self, record: &ReportRecord) -> DeliveryReport;
}
