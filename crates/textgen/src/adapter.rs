use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TextGenError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGenOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGenerationResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub max_context_tokens: u32,
    pub supports_structured_output: bool,
}

/// A text generation provider.
#[async_trait]
pub trait TextGenerationAdapter: Send + Sync {
    fn model_info(&self) -> TextModelInfo;

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &TextGenOptions,
    ) -> Result<TextGenerationResponse, TextGenError>;
}
