pub mod anthropic;
pub mod openai;
pub mod types;

use crate::config::station::{Provider, Station};
use crate::retry::{RetryPolicy, Transient};
use std::sync::Arc;
use std::time::Duration;

/// Prompt in, text out
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// LLM call errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Network error: failed to reach the LLM API: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unauthorized (401): invalid or missing API key. Check the station's api_key in ~/.config/keyquest/config.toml")]
    Unauthorized,

    #[error("Rate limit exceeded (429): {0}")]
    RateLimited(String),

    #[error("Bad request (400): {0}")]
    BadRequest(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty completion")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Station '{0}' has no API key configured")]
    MissingApiKey(String),
}

impl LlmError {
    /// Map a non-2xx status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LlmError::Unauthorized,
            429 => LlmError::RateLimited(body),
            400 => LlmError::BadRequest(body),
            500..=599 => LlmError::Server {
                status,
                message: body,
            },
            _ => LlmError::Api {
                status,
                message: body,
            },
        }
    }
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        !matches!(
            self,
            LlmError::Unauthorized | LlmError::BadRequest(_) | LlmError::MissingApiKey(_)
        )
    }

    fn timed_out(after: Duration) -> Self {
        LlmError::Timeout(after.as_millis() as u64)
    }
}

/// Call `generator` through the retry policy. Exhausted retries become
/// `None` so callers can degrade to "no output" for this prompt.
pub async fn generate_or_none(
    generator: &dyn TextGenerator,
    policy: &RetryPolicy,
    prompt: &str,
) -> Option<String> {
    match policy.run("llm", || generator.generate(prompt)).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, prompt_len = prompt.len(), "text generation failed");
            None
        }
    }
}

/// Build the client matching a station's provider
pub fn client_for_station(station: &Station) -> Result<Arc<dyn TextGenerator>, LlmError> {
    if station.has_placeholder_key() {
        return Err(LlmError::MissingApiKey(station.id.clone()));
    }

    tracing::debug!(
        station = %station.id,
        provider = ?station.provider,
        model = %station.model,
        "creating llm client"
    );

    let client: Arc<dyn TextGenerator> = match station.provider {
        Provider::OpenAI => Arc::new(openai::OpenAiClient::new(station.clone())?),
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::new(station.clone())?),
    };
    Ok(client)
}
