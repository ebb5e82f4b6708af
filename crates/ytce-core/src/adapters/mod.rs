mod offline;
mod openai;

use std::sync::Arc;

use crate::config::AdapterSettings;
use crate::models::{CoreError, ModelError, TaskConfig, TokenUsage};

pub use offline::OfflineModelAdapter;
pub use openai::{DEFAULT_BASE_URL, OpenAiCompatibleAdapter};

pub type AdapterResult<T> = Result<T, ModelError>;

/// One model call. `task` and `comment_ids` describe what the prompt asks
/// for; networked backends send only the prompt, offline backends use them
/// to synthesize a matching answer.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub task: &'a TaskConfig,
    pub comment_ids: &'a [String],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub usage: TokenUsage,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// Sends a compiled prompt to a model backend and returns its raw text.
/// Calls are blocking; the orchestrator runs them on the blocking pool.
pub trait ModelAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, request: &GenerateRequest<'_>) -> AdapterResult<ModelResponse>;
}

/// Picks the adapter for a run: offline for dry runs, otherwise the
/// networked OpenAI-compatible backend.
pub fn select_adapter(settings: &AdapterSettings) -> Result<Arc<dyn ModelAdapter>, CoreError> {
    if settings.dry_run {
        tracing::info!("dry run: using offline model adapter");
        return Ok(Arc::new(OfflineModelAdapter::new()));
    }
    let adapter = OpenAiCompatibleAdapter::from_settings(settings)?;
    tracing::info!(
        provider = %settings.provider,
        model = %settings.model,
        "using networked model adapter"
    );
    Ok(Arc::new(adapter))
}
