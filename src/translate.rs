use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TranslationConfig;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Translation adapter backed by an OpenAI-compatible chat endpoint.
pub struct TranslateClient {
    client: reqwest::Client,
    config: TranslationConfig,
}

impl TranslateClient {
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build translation HTTP client")?;
        Ok(Self { client, config })
    }

    /// Translate `text` into the configured target language.
    pub async fn translate(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(&self.config.target_lang),
                },
                ChatMessage {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        debug!("Sending translation request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send translation request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Translation API error ({}): {}", status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        extract_translation(chat_response)
    }

    /// Fail-open entry point used by the handlers: any provider problem, a
    /// disabled config, or blank input returns the original text unchanged.
    pub async fn translate_or_original(&self, text: &str) -> String {
        if !self.config.enabled || text.trim().is_empty() {
            return text.to_string();
        }
        match self.translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation failed, passing original text through: {:#}", e);
                text.to_string()
            }
        }
    }
}

fn system_prompt(target_lang: &str) -> String {
    format!(
        "You are a translator. Translate the user's message into {target_lang}. \
         Reply with the translation only, no commentary. If the message is \
         already in {target_lang}, reply with it unchanged."
    )
}

fn extract_translation(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Translation response contained no choices")?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Translation response was empty");
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trimmed_translation() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Hello\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_translation(response).unwrap(), "Hello");
    }

    #[test]
    fn empty_content_is_an_error() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#,
        )
        .unwrap();
        assert!(extract_translation(response).is_err());
    }

    #[test]
    fn no_choices_is_an_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_translation(response).is_err());
    }

    #[tokio::test]
    async fn disabled_client_passes_text_through() {
        let config = TranslationConfig {
            enabled: false,
            ..TranslationConfig::default()
        };
        let client = TranslateClient::new(config).unwrap();
        assert_eq!(client.translate_or_original("Привет").await, "Привет");
    }

    #[tokio::test]
    async fn blank_input_skips_the_provider() {
        let client = TranslateClient::new(TranslationConfig::default()).unwrap();
        assert_eq!(client.translate_or_original("   ").await, "   ");
    }
}
