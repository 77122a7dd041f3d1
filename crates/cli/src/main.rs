//! LibRelay CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: read the TOML file named by `--config`, apply
//!    command-line and environment overrides, and validate the result. A
//!    missing account, region or side-specific section stops the process here.
//! 2. **Wire observability**: configure `tracing-subscriber` and, when an
//!    endpoint is configured, the OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: create the cloud adapters the configured
//!    side needs and inject them into the [`rules::Executor`].
//! 4. **Select the event source**:
//!    - `once`: read events from a file or stdin, handle them, print one JSON
//!      report per event and exit (non-zero if any action failed).
//!    - `serve`: run the webhook until SIGINT/SIGTERM.

mod config;
mod shutdown;
mod telemetry;
mod wiring;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use listener::{SingleShotEventSource, WebhookEventSource};
use pipeline::DeploymentSide;
use rules::{EventReport, Relay, RunSummary};
use tracing::{error, info, warn};

use crate::config::{FileConfig, Overrides};

/// Cross-account release → update → build → failure-alert relay.
#[derive(Parser, Debug)]
#[command(name = "librelay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "LIBRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Which side of the bridge this relay serves.
    #[arg(long, env = "LIBRELAY_SIDE")]
    side: Option<DeploymentSide>,

    /// Account that owns the artifact repository and the alert topic.
    #[arg(long, env = "PRODUCER_ACCOUNT")]
    producer_account: Option<String>,

    /// Account that owns the dependent repository and its build.
    #[arg(long, env = "CONSUMER_ACCOUNT")]
    consumer_account: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Send every AWS call to this endpoint instead of the regional one.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Secret shared with the peer relay for signing webhook deliveries.
    #[arg(long, env = "LIBRELAY_SHARED_SECRET", hide_env_values = true)]
    shared_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle the events in a file (or stdin) and exit.
    Once {
        /// JSON file holding one event or an array of events; stdin if omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Receive events over HTTP until shut down.
    Serve {
        /// Address for the webhook (default 0.0.0.0:8080).
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}

fn print_report(report: &EventReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "Could not serialise event report"),
    }
}

fn log_report(report: &EventReport) {
    let failures = report.failures();
    if failures > 0 {
        warn!(
            invocation_id = %report.invocation_id,
            failures,
            "Event handled with failed actions"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = FileConfig::load_optional(cli.config.as_deref())?;
    let _telemetry = telemetry::init(&file.telemetry)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting librelay");

    let listen = match &cli.command {
        Command::Serve { listen } => *listen,
        Command::Once { .. } => None,
    };
    let overrides = Overrides {
        side: cli.side,
        producer_account: cli.producer_account,
        consumer_account: cli.consumer_account,
        region: cli.region,
        listen,
        aws_endpoint: cli.endpoint_url,
        shared_secret: cli.shared_secret,
    };
    let settings = config::resolve(file, overrides).inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    let executor = wiring::executor(&settings).await.inspect_err(|e| {
        error!(error = %e, "Failed to construct adapters");
    })?;
    let relay = Arc::new(Relay::new(&settings.relay, executor));

    let summary: RunSummary = match cli.command {
        Command::Once { input } => {
            let source = match &input {
                Some(path) => SingleShotEventSource::from_path(path).await?,
                None => SingleShotEventSource::from_stdin().await?,
            };
            relay.run(source, print_report).await
        }
        Command::Serve { .. } => {
            let secret = settings.webhook_secret().inspect_err(|e| {
                error!(error = %e, "Invalid configuration");
            })?;
            let source =
                WebhookEventSource::bind(settings.listen, secret, shutdown::shutdown_signal())
                    .await?;
            info!(addr = %source.local_addr(), "Relay serving");
            relay.run(source, log_report).await
        }
    };

    info!(
        events = summary.events,
        dropped = summary.dropped,
        actions_succeeded = summary.actions_succeeded,
        actions_failed = summary.actions_failed,
        "Relay finished"
    );
    if summary.actions_failed > 0 || summary.handler_panics > 0 {
        anyhow::bail!(
            "{} action(s) failed and {} handler(s) panicked",
            summary.actions_failed,
            summary.handler_panics
        );
    }
    Ok(())
}
