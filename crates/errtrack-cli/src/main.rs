//! errtrack CLI - Operator tool for the error tracker
//!
//! Provides commands for:
//! - Inspecting and validating the tracker configuration
//! - Previewing the sanitized payload of a fault
//! - Sending a test fault to the dashboard

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, preview::PreviewCommand, test_fault::TestCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "errtrack", version, about = "Fault reporting for Rust services")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the sanitized payload of a sample fault without sending it
    Preview(PreviewCommand),
    /// Send a sample fault to the dashboard
    Test(TestCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);
    let config_path = commands::config_path(cli.config.as_deref());

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::Preview(cmd) => cmd.execute(&config_path, format).await,
        Commands::Test(cmd) => cmd.execute(&config_path, format).await,
    }
}
