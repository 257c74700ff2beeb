//! Anthropic Messages API adapter.

use std::sync::Arc;

use async_trait::async_trait;
use picturebook_core::hashing::cache_key;
use picturebook_core::observability::Observability;
use serde::{Deserialize, Serialize};

use crate::adapter::{
    StopReason, TextGenOptions, TextGenerationAdapter, TextGenerationResponse, TextModelInfo,
    TokenUsage,
};
use crate::error::TextGenError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Response cache; consulted before every request.
    observability: Arc<dyn Observability>,
}

impl AnthropicAdapter {
    pub fn new(api_key: String, model: String, observability: Arc<dyn Observability>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            observability,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &TextGenOptions,
    ) -> Result<TextGenerationResponse, TextGenError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
            temperature: options.temperature,
            stop_sequences: &options.stop_sequences,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TextGenError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        into_generation_response(parsed)
    }
}

#[async_trait]
impl TextGenerationAdapter for AnthropicAdapter {
    fn model_info(&self) -> TextModelInfo {
        TextModelInfo {
            id: self.model.clone(),
            name: if self.model.contains("opus") {
                "Claude Opus".to_string()
            } else {
                "Claude Sonnet".to_string()
            },
            provider: "anthropic".to_string(),
            max_context_tokens: 200_000,
            supports_structured_output: true,
        }
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &TextGenOptions,
    ) -> Result<TextGenerationResponse, TextGenError> {
        let key = cache_key(&[&self.model, system_prompt, user_prompt]);
        if let Some(cached) = self.observability.get_text_cache(&key).await {
            match serde_json::from_str::<TextGenerationResponse>(&cached) {
                Ok(response) => {
                    tracing::debug!(cache_key = %key, "Text cache hit");
                    return Ok(response);
                }
                Err(e) => tracing::warn!(cache_key = %key, error = %e, "Ignoring unreadable cache entry"),
            }
        }

        tracing::debug!(model = %self.model, "Invoking Anthropic");
        let response = self.request(system_prompt, user_prompt, options).await?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Anthropic invocation completed"
        );

        if let Ok(serialized) = serde_json::to_string(&response) {
            self.observability.set_text_cache(&key, &serialized).await;
        }
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn into_generation_response(parsed: MessagesResponse) -> Result<TextGenerationResponse, TextGenError> {
    let text: String = parsed
        .content
        .iter()
        .filter(|b| b.block_type == "text")
        .filter_map(|b| b.text.as_deref())
        .collect();
    if text.is_empty() {
        return Err(TextGenError::EmptyResponse);
    }
    let stop_reason = match parsed.stop_reason.as_deref() {
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    };
    Ok(TextGenerationResponse {
        text,
        usage: parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default(),
        stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use picturebook_core::observability::NoopObservability;

    use super::*;

    #[test]
    fn response_concatenates_text_blocks() {
        let parsed: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use"},
                {"type": "text", "text": "1}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "stop_reason": "max_tokens"
        }))
        .unwrap();
        let response = into_generation_response(parsed).unwrap();
        assert_eq!(response.text, "{\"a\":1}");
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage.output_tokens, 5);
    }

    #[test]
    fn empty_content_is_an_error() {
        let parsed: MessagesResponse =
            serde_json::from_value(serde_json::json!({ "content": [] })).unwrap();
        assert_matches!(into_generation_response(parsed), Err(TextGenError::EmptyResponse));
    }

    #[test]
    fn request_omits_unset_options() {
        let stop: Vec<String> = Vec::new();
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: "s",
            messages: vec![Message { role: "user", content: "u" }],
            temperature: None,
            stop_sequences: &stop,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("stop_sequences").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn model_info_reports_provider() {
        let adapter = AnthropicAdapter::new(
            "key".into(),
            "claude-opus-4-5-20251101".into(),
            Arc::new(NoopObservability),
        );
        let info = adapter.model_info();
        assert_eq!(info.provider, "anthropic");
        assert_eq!(info.name, "Claude Opus");
    }
}
