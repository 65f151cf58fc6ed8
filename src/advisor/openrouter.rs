use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Advisor, AdvisorError};
use crate::config::AdvisorConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client pointed at OpenRouter.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterClient {
    /// Build a client, failing with `NotConfigured` when there is no usable key.
    pub fn new(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let api_key = config
            .usable_api_key()
            .ok_or_else(|| AdvisorError::NotConfigured("OpenRouter API key not configured".into()))?
            .to_string();

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AdvisorError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: chat_endpoint(&config.base_url),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

impl Advisor for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
        });

        debug!(endpoint = %self.endpoint, model = %self.model, "Requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AdvisorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Provider {
                status: status.as_u16(),
                body: truncate(&body, 320),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| extract_text(&content))
            .unwrap_or_default();

        Ok(content)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    if base_url.contains("/chat/completions") {
        base_url.to_string()
    } else {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_configured() {
        let config = AdvisorConfig::default();
        assert!(matches!(
            OpenRouterClient::new(&config),
            Err(AdvisorError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_chat_endpoint() {
        assert_eq!(
            chat_endpoint("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:8080/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_text_parts() {
        let content = json!([{ "type": "text", "text": "a" }, { "type": "text", "text": "b" }]);
        assert_eq!(extract_text(&content), "a\nb");
        assert_eq!(extract_text(&json!("plain")), "plain");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
