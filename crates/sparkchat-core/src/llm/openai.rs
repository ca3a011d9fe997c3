use crate::core_types::WireMessage;
use crate::errors::ChatError;
use crate::llm::{
    ChatCompletion, DEFAULT_API_BASE, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request_body(&self, messages: &[WireMessage]) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }

    fn parse_response(&self, response_text: &str) -> Result<String, ChatError> {
        let response: Value = serde_json::from_str(response_text)
            .map_err(|e| ChatError::MalformedResponse(format!("Invalid JSON response: {}", e)))?;

        let choices = response["choices"]
            .as_array()
            .ok_or_else(|| ChatError::MalformedResponse("No choices in response".to_string()))?;

        let choice = choices
            .first()
            .ok_or_else(|| ChatError::MalformedResponse("Empty choices array".to_string()))?;

        choice["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ChatError::MalformedResponse("First choice has no message content".to_string())
            })
    }
}

#[async_trait]
impl ChatCompletion for OpenAIClient {
    async fn complete(&self, api_key: &str, messages: &[WireMessage]) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request_body(messages);

        log::debug!("OpenAI API request to {} with {} messages", url, messages.len());
        log::debug!(
            "Request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ChatError::Transport(format!("Failed to read response: {}", e)))?;

        log::debug!("OpenAI API response ({}): {}", status, response_text);

        if !status.is_success() {
            log::warn!("OpenAI API request failed with status {}", status);
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        self.parse_response(&response_text)
    }
}
