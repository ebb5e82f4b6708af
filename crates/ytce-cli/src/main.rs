mod args;
mod files;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ytce_core::adapters::select_adapter;
use ytce_core::checkpoint::{CheckpointStore, InMemoryCheckpointStore, JsonlCheckpointStore};
use ytce_core::orchestration::Orchestrator;
use ytce_core::sqlite::SqliteCheckpointStore;

use crate::args::Args;

const EXIT_FATAL: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    let job = files::load_job(&args.job)?;
    let comments = files::load_comments(&args.input)?;
    let adapter = select_adapter(&args.adapter_settings())?;
    let checkpoint = open_checkpoint(args.checkpoint.as_deref())?;

    let orchestrator = Orchestrator::new(adapter, checkpoint, args.run_options())?;
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight batches");
            cancel.cancel();
        }
    });

    let report = match orchestrator.run(&job, comments).await {
        Ok(report) => report,
        Err(failure) => {
            if !failure.summary.tasks.is_empty() {
                println!("{}", failure.summary);
            }
            return Err(failure.into());
        }
    };
    files::write_results(&args.output, &report.result)?;
    println!("{}", report.summary);

    if report.cancelled {
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    Ok(ExitCode::SUCCESS)
}

fn open_checkpoint(path: Option<&Path>) -> Result<Arc<dyn CheckpointStore>> {
    let Some(path) = path else {
        return Ok(Arc::new(InMemoryCheckpointStore::new()));
    };
    let sqlite = matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("sqlite3" | "sqlite" | "db")
    );
    if sqlite {
        let store = SqliteCheckpointStore::open(path)
            .with_context(|| format!("failed to open checkpoint database {}", path.display()))?;
        return Ok(Arc::new(store));
    }
    let store = JsonlCheckpointStore::open(path)
        .with_context(|| format!("failed to open checkpoint log {}", path.display()))?;
    Ok(Arc::new(store))
}
