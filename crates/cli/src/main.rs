//! Code scanning connector CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: load `.code-scanning/config.toml` (or the
//!    file given with `--config`), apply environment overrides, and validate.
//! 2. **Wire observability**: configure `tracing-subscriber` with a JSON layer
//!    and, when an endpoint is configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: create the [`github::GithubClient`] and
//!    inject it into the [`findings::CodeScanningAlertDefinition`].
//! 4. **Run the command**: `sync` streams connector objects to stdout as JSON
//!    lines; `schema` prints the object class schema and metadata.

mod config;
mod output;
mod telemetry;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use connector::{FindingDefinition, OperationOptions, Timestamp};
use findings::code_scanning::{schema, schema_metadata};
use findings::CodeScanningAlertDefinition;
use github::GithubClient;
use tracing::info;

use crate::config::CliConfig;
use crate::output::JsonLinesHandler;

#[derive(Debug, Parser)]
#[command(name = "code-scanning-sync", version, about = "Sync GitHub code scanning alerts as connector objects")]
struct Cli {
    /// Configuration file (defaults to `.code-scanning/config.toml` when present).
    #[arg(long, global = true, env = "CODE_SCANNING_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream code scanning alert definitions to stdout, one JSON object per line.
    Sync {
        /// Only alerts updated at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<Timestamp>,

        /// Stop after this many objects.
        #[arg(long)]
        limit: Option<u64>,

        /// Records per API page (1-100).
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Print the object class schema and metadata as JSON.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Schema => {
            let document = serde_json::json!({
                "schema": schema(),
                "metadata": schema_metadata(),
            });
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &document)?;
            writeln!(stdout)?;
            Ok(())
        }
        Command::Sync {
            since,
            limit,
            page_size,
        } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let _telemetry = telemetry::init(&config.telemetry)?;
            run_sync(config, since.unwrap_or(Timestamp::UNIX_EPOCH), limit, page_size).await
        }
    }
}

async fn run_sync(
    config: CliConfig,
    since: Timestamp,
    limit: Option<u64>,
    page_size: Option<u32>,
) -> anyhow::Result<()> {
    info!(
        service = %config.telemetry.service_name,
        api_url = %config.github.api_url,
        %since,
        "Starting code scanning sync"
    );

    let client = GithubClient::new(config.github).context("failed to create GitHub client")?;
    let definition = CodeScanningAlertDefinition::new(client);
    let mut handler = JsonLinesHandler::new(std::io::stdout(), limit);

    let summary = definition
        .sync(since, &mut handler, &OperationOptions { page_size })
        .await
        .context("code scanning sync failed")?;
    let written = handler.written();
    handler.finish().context("failed to write objects")?;

    info!(
        written,
        alerts = summary.alerts,
        skipped = summary.skipped,
        stopped = summary.stopped,
        "Code scanning sync complete"
    );
    Ok(())
}
