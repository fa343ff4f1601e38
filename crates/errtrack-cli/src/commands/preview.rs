//! Preview command - Show the payload a fault would produce
//!
//! Builds a report from a synthetic fault and request using the effective
//! configuration and prints the sanitized JSON. Nothing is sent.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use errtrack_core::domain::{DottedTaxonomy, FaultKind};
use errtrack_core::policy::ReportPolicy;
use errtrack_core::ports::HostEnvironment;
use errtrack_telemetry::{PayloadBuilder, ProcessHost};
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Arguments for the preview subcommand
#[derive(Debug, clap::Args)]
pub struct PreviewCommand {
    /// Fault kind of the synthetic fault
    #[arg(long, default_value = super::SAMPLE_KIND)]
    pub kind: String,

    /// Message of the synthetic fault
    #[arg(long, default_value = "errtrack preview fault")]
    pub message: String,
}

impl PreviewCommand {
    /// Execute the preview command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let kind = FaultKind::new(&self.kind)
            .with_context(|| format!("Invalid fault kind '{}'", self.kind))?;
        let config = Arc::new(super::effective_config(config_path));
        let host = Arc::new(ProcessHost::collect(super::framework_version()));
        let environment = host.environment_name();

        info!(kind = %kind, environment = %environment, "Building preview report");

        let verdict = ReportPolicy::new(&config, &DottedTaxonomy).evaluate(&kind, &environment);

        let fault = super::sample_fault(kind, &self.message);
        let builder = PayloadBuilder::new(Arc::clone(&config), host);
        let record = builder.build(&fault, &super::sample_request());
        let payload =
            serde_json::to_value(&record).context("Failed to serialize report payload")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "would_report": verdict.is_ok(),
                "rejected_because": verdict.err().map(|r| r.to_string()),
                "payload": payload,
            }));
        } else {
            match verdict {
                Ok(()) => formatter.success("This fault would be reported"),
                Err(reason) => formatter.warn(&format!("This fault would be dropped: {}", reason)),
            }
            formatter.field("Environment", &environment);
            formatter.field("Application", &record.application_id);
            formatter.info("");
            formatter.print_json(&payload);
        }

        Ok(())
    }
}
