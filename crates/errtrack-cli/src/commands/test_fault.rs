//! Test command - Send a synthetic fault through the full pipeline
//!
//! The fault goes through policy, payload building, sanitization and
//! delivery exactly like a real one. Attempt diagnostics are captured from
//! the delivery client and printed alongside the outcome.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use errtrack_core::domain::{FaultKind, ReportRecord};
use errtrack_core::ports::{DeliveryReport, ReportSink};
use errtrack_delivery::DeliveryClient;
use errtrack_telemetry::ProcessHost;
use errtrack_tracker::{ErrorTracker, ReportOutcome};
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Arguments for the test subcommand
#[derive(Debug, clap::Args)]
pub struct TestCommand {
    /// Fault kind of the synthetic fault
    #[arg(long, default_value = super::SAMPLE_KIND)]
    pub kind: String,

    /// Message of the synthetic fault
    #[arg(long, default_value = "errtrack test fault")]
    pub message: String,
}

/// Sink that delivers through the client and keeps the last delivery report
struct RecordingClient {
    client: DeliveryClient,
    last: Mutex<Option<DeliveryReport>>,
}

impl RecordingClient {
    fn new(client: DeliveryClient) -> Self {
        Self {
            client,
            last: Mutex::new(None),
        }
    }

    fn take_last(&self) -> Option<DeliveryReport> {
        self.last.lock().ok().and_then(|mut last| last.take())
    }
}

#[async_trait]
impl ReportSink for RecordingClient {
    async fn submit(&self, record: &ReportRecord) -> DeliveryReport {
        let report = self.client.deliver(record).await;
        if let Ok(mut last) = self.last.lock() {
            *last = Some(report.clone());
        }
        report
    }
}

impl TestCommand {
    /// Execute the test command; fails when the fault is not delivered
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let kind = FaultKind::new(&self.kind)
            .with_context(|| format!("Invalid fault kind '{}'", self.kind))?;
        let config = Arc::new(super::effective_config(config_path));

        if config.http_client.retry == 0 {
            formatter.warn("http_client.retry is 0: no delivery attempt will be made");
        }

        let client =
            DeliveryClient::new(&config).context("Failed to create delivery client")?;
        let endpoint = client.endpoint().to_string();
        let sink = Arc::new(RecordingClient::new(client));
        let host = Arc::new(ProcessHost::collect(super::framework_version()));
        let shared_sink: Arc<dyn ReportSink> = sink.clone();
        let tracker = ErrorTracker::new(Arc::clone(&config), host, shared_sink);

        info!(kind = %kind, endpoint = %endpoint, "Sending test fault");

        let fault = super::sample_fault(kind, &self.message);
        let outcome = tracker.report(&fault, &super::sample_request()).await;
        let delivery = sink.take_last();

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&outcome_json(&endpoint, &outcome, delivery.as_ref()));
        } else {
            match &outcome {
                ReportOutcome::Delivered { attempts } => formatter.success(&format!(
                    "Test fault delivered after {} attempt{}",
                    attempts,
                    if *attempts == 1 { "" } else { "s" }
                )),
                ReportOutcome::Rejected(reason) => {
                    formatter.warn(&format!("Test fault not sent: {}", reason))
                }
                ReportOutcome::Failed { reason, .. } => {
                    formatter.error(&format!("Test fault not delivered: {}", reason))
                }
            }
            formatter.field("Endpoint", &endpoint);
            if let Some(delivery) = &delivery {
                for attempt in &delivery.attempts {
                    let status = attempt
                        .status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let result = attempt
                        .failure
                        .as_ref()
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "accepted".to_string());
                    formatter.field(
                        &format!("Attempt {}", attempt.number),
                        &format!("status {} ({})", status, result),
                    );
                }
                if !delivery.backoff.is_zero() {
                    formatter.field("Waited", &format!("{:?}", delivery.backoff));
                }
            }
        }

        if !outcome.is_delivered() {
            anyhow::bail!("test fault was not delivered");
        }
        Ok(())
    }
}

fn outcome_json(
    endpoint: &str,
    outcome: &ReportOutcome,
    delivery: Option<&DeliveryReport>,
) -> serde_json::Value {
    let (status, reason) = match outcome {
        ReportOutcome::Delivered { .. } => ("delivered", None),
        ReportOutcome::Rejected(reason) => ("rejected", Some(reason.to_string())),
        ReportOutcome::Failed { reason, .. } => ("failed", Some(reason.clone())),
    };

    let attempts: Vec<serde_json::Value> = delivery
        .map(|d| {
            d.attempts
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "number": a.number,
                        "status": a.status,
                        "failure": a.failure.as_ref().map(|f| f.to_string()),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    serde_json::json!({
        "outcome": status,
        "reason": reason,
        "endpoint": endpoint,
        "attempts": attempts,
        "backoff_ms": delivery.map(|d| d.backoff.as_millis() as u64).unwrap_or(0),
    })
}
