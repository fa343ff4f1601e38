//! Config command - Inspect and check the tracker configuration
//!
//! Provides the `errtrack config` CLI command which:
//! 1. Shows the effective configuration (file, defaults and environment
//!    overrides) with the API key masked
//! 2. Validates the configuration file and reports every problem found

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use errtrack_core::config::{TrackerConfig, ValidationError};
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config_path, format).await,
            ConfigCommand::Validate => self.execute_validate(config_path, format).await,
        }
    }

    async fn execute_show(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let config = super::effective_config(config_path).redacted();

        info!(config_path = %config_path.display(), "Showing configuration");

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;

            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    /// Fails with a non-zero exit when the file cannot be read or is invalid
    async fn execute_validate(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Missing file means defaults plus environment; a broken file is an error
        let mut config = if config_path.exists() {
            match TrackerConfig::load(config_path) {
                Ok(config) => config,
                Err(e) => {
                    if matches!(format, OutputFormat::Json) {
                        formatter.print_json(&serde_json::json!({
                            "valid": false,
                            "config_path": config_path.display().to_string(),
                            "errors": [e.to_string()],
                            "warnings": [],
                        }));
                    } else {
                        formatter.error(&format!("Failed to parse configuration: {}", e));
                        formatter.info(&format!("File: {}", config_path.display()));
                    }
                    anyhow::bail!("configuration could not be loaded");
                }
            }
        } else {
            formatter.warn(&format!(
                "Configuration file not found at {}, checking defaults",
                config_path.display()
            ));
            TrackerConfig::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();
        let warnings = config_warnings(&config);

        if matches!(format, OutputFormat::Json) {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
                "warnings": warnings,
            }));
        } else {
            report_errors(formatter.as_ref(), config_path, &errors);
            for warning in &warnings {
                formatter.warn(warning);
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "configuration has {} error{}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }
}

fn report_errors(
    formatter: &dyn crate::output::OutputFormatter,
    config_path: &Path,
    errors: &[ValidationError],
) {
    if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
        return;
    }

    formatter.error(&format!(
        "Configuration has {} error{}:",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    ));
    formatter.info(&format!("File: {}", config_path.display()));
    formatter.info("");
    for error in errors {
        formatter.info(&format!("  {} - {}", error.field, error.message));
    }
}

/// Settings that are valid but probably not what the operator meant
fn config_warnings(config: &TrackerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.http_client.retry == 0 {
        warnings.push("http_client.retry is 0: faults will never be sent".to_string());
    }
    if !config.enabled {
        warnings.push("error tracking is disabled".to_string());
    }
    if config.environments.is_empty() {
        warnings.push("environments is empty: no environment is tracked".to_string());
    }
    if !config.http_client.verify_tls {
        warnings.push("http_client.verify_tls is off".to_string());
    }

    warnings
}
