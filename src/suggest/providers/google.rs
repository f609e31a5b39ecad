use crate::config::settings::SuggestSettings;
use crate::suggest::{SuggestError, SuggestProvider};
use std::time::Duration;

pub const DEFAULT_SUGGEST_URL: &str = "https://suggestqueries.google.com/complete/search";

/// Google autocomplete ("suggest queries") provider
///
/// No API key required. The endpoint answers with a JSON array whose second
/// element is the list of suggestions, e.g. `["query", ["a", "b"], ...]`.
pub struct GoogleSuggestProvider {
    client: reqwest::Client,
    base_url: String,
    client_param: String,
}

impl GoogleSuggestProvider {
    pub fn new() -> Result<Self, SuggestError> {
        Self::with_base_url(DEFAULT_SUGGEST_URL, "chrome")
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        client_param: impl Into<String>,
    ) -> Result<Self, SuggestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            client_param: client_param.into(),
        })
    }

    pub fn from_settings(settings: &SuggestSettings) -> Result<Self, SuggestError> {
        Self::with_base_url(settings.base_url.clone(), settings.client.clone())
    }

    /// The endpoint does not always answer in UTF-8; fall back to ISO-8859-1
    fn decode_body(bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Extract the suggestion list from a response body, capped to `limit`
    fn parse_suggestions(body: &str, limit: usize) -> Result<Vec<String>, SuggestError> {
        let json: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| SuggestError::MalformedResponse(e.to_string()))?;

        let list = json
            .get(1)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SuggestError::MalformedResponse("missing suggestion list".to_string())
            })?;

        Ok(list
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .take(limit)
            .collect())
    }
}

#[async_trait::async_trait]
impl SuggestProvider for GoogleSuggestProvider {
    async fn suggest(
        &self,
        query: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<String>, SuggestError> {
        tracing::debug!(
            query = %query,
            language = %language,
            limit,
            "requesting autocomplete suggestions"
        );

        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("hl", language),
                ("gl", language),
                ("client", self.client_param.as_str()),
                ("_", cache_buster.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            tracing::warn!(
                status = %status,
                error = %error_text,
                "autocomplete endpoint error"
            );

            return match status.as_u16() {
                429 => Err(SuggestError::RateLimitExceeded),
                _ => Err(SuggestError::ApiError(format!(
                    "HTTP {}: {}",
                    status, error_text
                ))),
            };
        }

        let bytes = response.bytes().await?;
        let body = Self::decode_body(&bytes);
        let suggestions = Self::parse_suggestions(&body, limit)?;

        tracing::debug!(
            query = %query,
            result_count = suggestions.len(),
            "autocomplete request completed"
        );

        Ok(suggestions)
    }
}
