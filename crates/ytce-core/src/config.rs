use std::time::Duration;

use crate::models::CoreError;
use crate::prompt::MAX_BATCH_RECORDS;
use crate::retry::Backoff;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_COMMENT_CHARS: usize = 2000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Construction parameters for one analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    pub batch_size: usize,
    pub max_records: Option<usize>,
    pub max_retries: u32,
    pub backoff: Backoff,
    pub max_in_flight: usize,
    pub max_comment_chars: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_records: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
            max_in_flight: 1,
            max_comment_chars: Some(DEFAULT_MAX_COMMENT_CHARS),
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_RECORDS {
            return Err(CoreError::config(
                None,
                format!(
                    "batch size must be between 1 and {MAX_BATCH_RECORDS}, got {}",
                    self.batch_size
                ),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(CoreError::config(
                None,
                "max in-flight requests must be greater than zero",
            ));
        }
        if self.max_comment_chars == Some(0) {
            return Err(CoreError::config(
                None,
                "max comment length must be greater than zero when provided",
            ));
        }
        if !(self.backoff.multiplier.is_finite() && self.backoff.multiplier >= 1.0) {
            return Err(CoreError::config(
                None,
                "backoff multiplier must be a finite number >= 1.0",
            ));
        }
        Ok(())
    }
}

/// Selects and configures the model adapter. `provider` and `model` are
/// passed through to the backend without interpretation.
#[derive(Clone, PartialEq)]
pub struct AdapterSettings {
    pub dry_run: bool,
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            provider: "openai".to_string(),
            model: "gpt-4.1-nano".to_string(),
            api_key: None,
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for AdapterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSettings")
            .field("dry_run", &self.dry_run)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
