//! volley CLI - containerized system-test dispatcher.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use volley::cli::Cli;
use volley::config;
use volley::orchestrator::Orchestrator;
use volley::suites;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Under --json the process's combined output stream is the wire
    // payload, so no subscriber is installed at all and tracing calls are
    // no-ops.
    if !cli.json {
        let log_level = if cli.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = config::load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let registry = suites::registry();
    let orchestrator = Orchestrator::new(config, cli.mode(), cli.json, cli.passthrough);
    orchestrator.run(&registry, &cli.tests).await
}
