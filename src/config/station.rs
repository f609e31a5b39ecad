use serde::{Deserialize, Serialize};

/// A "station" represents one LLM endpoint used for theme analysis and
/// question generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Unique identifier for this station
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Provider type
    pub provider: Provider,

    /// API key
    pub api_key: String,

    /// Optional custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Model identifier
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// System prompt sent ahead of every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Station {
    /// Base URL for API calls, falling back to the provider default
    pub fn base_url(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// True while the key is still the placeholder written by `Config::default`
    pub fn has_placeholder_key(&self) -> bool {
        self.api_key.trim().is_empty() || self.api_key == PLACEHOLDER_API_KEY
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }
}

pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an SEO expert specialised in analysing \
conversational search queries and optimising content for search engines.";

pub(crate) fn default_stations() -> Vec<Station> {
    vec![
        Station {
            id: "openai".to_string(),
            name: "GPT-4o mini".to_string(),
            provider: Provider::OpenAI,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            api_base: Some("https://api.openai.com".to_string()),
            model: "gpt-4o-mini".to_string(),
            max_tokens: Some(1500),
            temperature: Some(0.7),
            system_prompt: None,
        },
        Station {
            id: "claude".to_string(),
            name: "Claude 3.5 Haiku".to_string(),
            provider: Provider::Anthropic,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            api_base: Some("https://api.anthropic.com".to_string()),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: Some(1500),
            temperature: Some(0.7),
            system_prompt: None,
        },
    ]
}
