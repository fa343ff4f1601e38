//! Collection endpoint client
//!
//! Posts serialized [`ReportRecord`]s to `{dashboard_url}/api/errors` with a
//! fixed attempt budget and a constant pause between attempts. Delivery never
//! returns an error: every failure mode ends up in the [`DeliveryReport`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use errtrack_core::config::TrackerConfig;
//! use errtrack_delivery::client::DeliveryClient;
//!
//! # async fn example(
//! #     record: errtrack_core::domain::ReportRecord,
//! # ) -> Result<(), errtrack_delivery::DeliveryError> {
//! let client = DeliveryClient::new(&TrackerConfig::default())?;
//! let report = client.deliver(&record).await;
//! println!("delivered: {} after {} attempts", report.delivered, report.attempt_count());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use errtrack_core::config::TrackerConfig;
use errtrack_core::domain::ReportRecord;
use errtrack_core::ports::{AttemptFailure, AttemptRecord, DeliveryReport, ReportSink};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::DeliveryError;

/// Path of the collection endpoint relative to the dashboard URL
pub const COLLECTION_PATH: &str = "/api/errors";

/// Pause between two consecutive attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(200);

const JSON: &str = "application/json";

// ============================================================================
// Endpoint resolution
// ============================================================================

/// Resolves the collection endpoint from a dashboard URL
///
/// Trailing slashes are trimmed and the scheme is forced to `https`: an
/// `http` URL is upgraded and a URL without a scheme gets one. Any other
/// scheme is rejected.
pub fn resolve_endpoint(dashboard_url: &str) -> Result<Url, DeliveryError> {
    let trimmed = dashboard_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(DeliveryError::InvalidEndpoint(
            "dashboard URL is empty".to_string(),
        ));
    }

    let secure = match trimmed.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http") =>
        {
            format!("https://{rest}")
        }
        Some((scheme, _)) => return Err(DeliveryError::UnsupportedScheme(scheme.to_string())),
        None => format!("https://{trimmed}"),
    };

    join_collection_path(&secure)
}

fn join_collection_path(base: &str) -> Result<Url, DeliveryError> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), COLLECTION_PATH);
    Url::parse(&endpoint).map_err(|e| DeliveryError::InvalidEndpoint(format!("{endpoint}: {e}")))
}

// ============================================================================
// DeliveryClient
// ============================================================================

/// HTTP client for the collection endpoint
///
/// Safe to share between concurrently faulting tasks. Each attempt opens
/// its own connection.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    /// The underlying HTTP client, carrying the per-attempt timeout
    client: Client,
    /// Fully resolved `.../api/errors` URL
    endpoint: Url,
    /// Bearer token
    api_key: String,
    /// Number of attempts per report
    attempts: u32,
}

impl DeliveryClient {
    /// Creates a client for the configured dashboard
    ///
    /// # Arguments
    /// * `config` - Tracker configuration supplying URL, key, timeout and retry budget
    pub fn new(config: &TrackerConfig) -> Result<Self, DeliveryError> {
        let endpoint = resolve_endpoint(&config.dashboard_url)?;
        Self::build(config, endpoint)
    }

    /// Creates a client posting to `base_url` as given, without the https
    /// upgrade (useful for testing against a local mock server)
    ///
    /// # Arguments
    /// * `config` - Tracker configuration supplying key, timeout and retry budget
    /// * `base_url` - Base URL the collection path is appended to
    pub fn with_base_url(
        config: &TrackerConfig,
        base_url: impl AsRef<str>,
    ) -> Result<Self, DeliveryError> {
        let endpoint = join_collection_path(base_url.as_ref())?;
        Self::build(config, endpoint)
    }

    fn build(config: &TrackerConfig, endpoint: Url) -> Result<Self, DeliveryError> {
        if !config.http_client.verify_tls {
            warn!("TLS certificate verification is disabled for fault delivery");
        }

        // Reports may be sent from short-lived runtimes (panic hook), so
        // pooled connections must not outlive the call that opened them.
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(!config.http_client.verify_tls)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            attempts: config.retry_count(),
        })
    }

    /// Returns the resolved collection endpoint
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the number of attempts made per report
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    // ========================================================================
    // Delivery with retry
    // ========================================================================

    /// Delivers the record, retrying on any failure
    ///
    /// Makes up to the configured number of attempts. An attempt succeeds
    /// when the endpoint answers 2xx. Transport errors and timeouts count as
    /// failed attempts. The client sleeps [`RETRY_DELAY`] between attempts,
    /// never after the last one. A budget of zero makes no attempt at all.
    pub async fn deliver(&self, record: &ReportRecord) -> DeliveryReport {
        let body = match record.to_json() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode fault report");
                return DeliveryReport::aborted(format!("failed to encode report: {e}"));
            }
        };

        let mut report = DeliveryReport::default();

        if self.attempts == 0 {
            warn!("Retry budget is 0, fault report not sent");
            return report;
        }

        for number in 1..=self.attempts {
            info!(
                attempt = number,
                app_id = %record.application_id,
                api_key_exists = !self.api_key.is_empty(),
                endpoint = %self.endpoint,
                "Sending fault report"
            );

            match self.send(body.clone()).await {
                Ok((status, response)) if (200..300).contains(&status) => {
                    info!(attempt = number, status, "Fault report accepted");
                    debug!(response = %response, "Collection endpoint response");
                    report.attempts.push(AttemptRecord::accepted(number, status));
                    report.delivered = true;
                    return report;
                }
                Ok((status, response)) => {
                    warn!(
                        attempt = number,
                        status,
                        response = %response,
                        "Collection endpoint rejected fault report"
                    );
                    report
                        .attempts
                        .push(AttemptRecord::failed(number, AttemptFailure::Status(status)));
                }
                Err(failure) => {
                    warn!(attempt = number, error = %failure, "Fault report attempt failed");
                    report.attempts.push(AttemptRecord::failed(number, failure));
                }
            }

            if number < self.attempts {
                tokio::time::sleep(RETRY_DELAY).await;
                report.backoff += RETRY_DELAY;
            }
        }

        warn!(
            attempts = self.attempts,
            "Fault report not delivered, attempts exhausted"
        );
        report
    }

    /// Boolean view of [`DeliveryClient::deliver`]
    pub async fn deliver_ok(&self, record: &ReportRecord) -> bool {
        self.deliver(record).await.delivered
    }

    /// One POST; returns the status code and response body text
    async fn send(&self, body: Vec<u8>) -> Result<(u16, String), AttemptFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }
}

fn classify(error: reqwest::Error) -> AttemptFailure {
    if error.is_timeout() {
        AttemptFailure::Timeout
    } else {
        AttemptFailure::Transport(error.to_string())
    }
}

#[async_trait]
impl ReportSink for DeliveryClient {
    async fn submit(&self, record: &ReportRecord) -> DeliveryReport {
        self.deliver(record).await
    }
}
