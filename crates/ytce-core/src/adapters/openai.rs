use std::io::ErrorKind;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::adapters::{AdapterResult, GenerateRequest, ModelAdapter, ModelResponse};
use crate::config::AdapterSettings;
use crate::models::{CoreError, ModelError, ModelErrorKind, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_MESSAGE: &str = "You are a precise comment analysis assistant. \
Always answer with valid JSON that follows the requested output format exactly.";
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

/// Chat-completions client for OpenAI and API-compatible providers.
pub struct OpenAiCompatibleAdapter {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleAdapter {
    pub fn from_settings(settings: &AdapterSettings) -> Result<Self, CoreError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CoreError::config(
                    None,
                    format!(
                        "an API key is required for provider '{}' (or use a dry run)",
                        settings.provider
                    ),
                )
            })?;
        if settings.model.trim().is_empty() {
            return Err(CoreError::config(None, "model name must not be empty"));
        }
        if settings.request_timeout.is_zero() {
            return Err(CoreError::config(None, "request timeout must be greater than zero"));
        }

        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        Ok(Self {
            agent: build_agent(settings.request_timeout),
            endpoint: format!("{base_url}/chat/completions"),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
        })
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

impl ModelAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> AdapterResult<ModelResponse> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_output_tokens,
        });

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(classify_error)?;

        let text = response.into_string().map_err(|error| {
            ModelError::new(
                ModelErrorKind::TransportError,
                format!("failed to read response body: {error}"),
            )
        })?;
        parse_completion(&text)
    }
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn parse_completion(body: &str) -> AdapterResult<ModelResponse> {
    let completion: Completion = serde_json::from_str(body).map_err(|error| {
        ModelError::new(
            ModelErrorKind::InvalidResponse,
            format!("completion body is not valid JSON: {error}"),
        )
    })?;

    let text = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            ModelError::new(
                ModelErrorKind::InvalidResponse,
                "completion contained no message content",
            )
        })?;

    let usage = completion
        .usage
        .map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
        .unwrap_or_default();
    Ok(ModelResponse { text, usage })
}

fn classify_error(error: ureq::Error) -> ModelError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            ModelError::new(
                classify_status(code),
                format!("provider returned HTTP {code}: {preview}"),
            )
        }
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<std::io::Error>())
                .is_some_and(|io| matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock));
            let kind = if timed_out {
                ModelErrorKind::Timeout
            } else {
                ModelErrorKind::TransportError
            };
            ModelError::new(kind, transport.to_string())
        }
    }
}

pub(crate) fn classify_status(code: u16) -> ModelErrorKind {
    match code {
        401 | 403 => ModelErrorKind::AuthFailure,
        429 => ModelErrorKind::RateLimited,
        408 | 504 => ModelErrorKind::Timeout,
        _ => ModelErrorKind::TransportError,
    }
}
