use crate::config::station::Station;
use crate::llm::types::{ChatCompletionRequest, ChatCompletionResponse, Message};
use crate::llm::{LlmError, TextGenerator};
use crate::logging::redact_secrets;
use reqwest::Client;
use std::time::Duration;

/// OpenAI chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    station: Station,
}

impl OpenAiClient {
    pub fn new(station: Station) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, station })
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.station.model.clone(),
            messages: vec![
                Message::system(self.station.system_prompt()),
                Message::user(prompt),
            ],
            max_tokens: Some(self.station.max_tokens.unwrap_or(1500)),
            temperature: self.station.temperature,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.station.base_url());

        tracing::debug!(
            api_base = %self.station.base_url(),
            model = %self.station.model,
            prompt_len = prompt.len(),
            "openai chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.station.api_key)
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
                "openai api returned error"
            );

            return Err(LlmError::from_status(status.as_u16(), redact_secrets(&error_text)));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let text = body.into_text().ok_or(LlmError::EmptyResponse)?;
        tracing::debug!(response_len = text.len(), "openai completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::station::Provider;
    use crate::llm::types::Role;

    fn station() -> Station {
        Station {
            id: "test".to_string(),
            name: "Test".to_string(),
            provider: Provider::OpenAI,
            api_key: "sk-test".to_string(),
            api_base: Some("https://example.invalid/".to_string()),
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            temperature: Some(0.7),
            system_prompt: Some("You are terse.".to_string()),
        }
    }

    #[test]
    fn test_request_body_has_system_then_user() {
        let client = OpenAiClient::new(station()).unwrap();
        let body = client.request_body("list questions");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, Role::System);
        assert_eq!(body.messages[0].content, "You are terse.");
        assert_eq!(body.messages[1].content, "list questions");
        assert_eq!(body.max_tokens, Some(1500));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(station().base_url(), "https://example.invalid");
    }
}
