use crate::config::station::Station;
use crate::llm::types::{CreateMessageRequest, CreateMessageResponse, Message};
use crate::llm::{LlmError, TextGenerator};
use crate::logging::redact_secrets;
use reqwest::Client;
use std::time::Duration;

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    station: Station,
}

impl AnthropicClient {
    pub fn new(station: Station) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, station })
    }

    fn request_body(&self, prompt: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.station.model.clone(),
            system: Some(self.station.system_prompt().to_string()),
            messages: vec![Message::user(prompt)],
            max_tokens: self.station.max_tokens.unwrap_or(1500),
            temperature: self.station.temperature,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.station.base_url());

        tracing::debug!(
            api_base = %self.station.base_url(),
            model = %self.station.model,
            prompt_len = prompt.len(),
            "anthropic messages request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.station.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::warn!(
                status = %status,
                error = %redact_secrets(&error_text),
                "anthropic api returned error"
            );

            return Err(LlmError::from_status(status.as_u16(), redact_secrets(&error_text)));
        }

        let body: CreateMessageResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let text = body.into_text().ok_or(LlmError::EmptyResponse)?;
        tracing::debug!(response_len = text.len(), "anthropic message received");
        Ok(text)
    }
}
