use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ytce_core::config::{AdapterSettings, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, RunOptions};

#[derive(Debug, Parser)]
#[command(
    name = "ytce-analyze",
    version,
    about = "Run LLM analysis tasks over a set of comments"
)]
pub struct Args {
    /// Job file (YAML) listing the tasks to run
    #[arg(long)]
    pub job: PathBuf,

    /// Input records, one JSON object per line with `id` and `text`
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the enriched records (JSONL)
    #[arg(long)]
    pub output: PathBuf,

    /// Checkpoint file for resume; `.sqlite3`/`.db` selects SQLite, anything else JSONL
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Answer with the deterministic offline model instead of calling a provider
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Only process the first N records
    #[arg(long)]
    pub max_records: Option<usize>,

    /// Batches allowed in flight at once
    #[arg(long, default_value_t = 1)]
    pub max_in_flight: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    #[arg(long, env = "YTCE_PROVIDER", default_value = "openai")]
    pub provider: String,

    #[arg(long, env = "YTCE_MODEL", default_value = "gpt-4.1-nano")]
    pub model: String,

    #[arg(long, env = "YTCE_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "YTCE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub request_timeout: u64,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            batch_size: self.batch_size,
            max_records: self.max_records,
            max_retries: self.max_retries,
            max_in_flight: self.max_in_flight,
            ..RunOptions::default()
        }
    }

    pub fn adapter_settings(&self) -> AdapterSettings {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        AdapterSettings {
            dry_run: self.dry_run,
            provider: self.provider.clone(),
            model: self.model.clone(),
            api_key,
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}
