//! Edge QC command line entry point.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]

use std::process::ExitCode;

use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::{error, info};

use tmkp_edge_qc::config::{AppConfig, Command};
use tmkp_edge_qc::{QcPipeline, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env (if present)
    let _ = dotenv();

    let (cli, config) = match AppConfig::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    telemetry::init(config.logging.format);

    let result = match &cli.command {
        Command::Classify(args) => classify(&config, &args.edges, &args.nodes).await,
        Command::Serve(_) => server::start_server(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(name: "app.failed", error = %format!("{e:#}"), "Run failed");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn classify(
    config: &AppConfig,
    edges: &std::path::Path,
    nodes: &std::path::Path,
) -> anyhow::Result<()> {
    let pipeline = QcPipeline::from_config(config)?;
    let summary = pipeline.run(edges, nodes).await?;
    info!(
        name: "app.summary",
        summary = %serde_json::to_string(&summary)?,
        "Classification complete"
    );
    Ok(())
}
