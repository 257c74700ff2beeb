//! Canned-response text adapter.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::adapter::{
    StopReason, TextGenOptions, TextGenerationAdapter, TextGenerationResponse, TextModelInfo,
    TokenUsage,
};
use crate::error::TextGenError;

pub const MOCK_MODEL_ID: &str = "mock-text-model";
const FALLBACK_TEXT: &str = "Mock response for testing";

#[derive(Debug, Default)]
struct MockState {
    /// (needle, response) pairs, matched in insertion order.
    responses: Vec<(String, String)>,
    prompts: Vec<(String, String)>,
}

/// Answers with the first canned response whose needle appears in the
/// system or user prompt.
#[derive(Debug, Default)]
pub struct MockTextAdapter {
    state: Mutex<MockState>,
}

impl MockTextAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&self, prompt_contains: impl Into<String>, response: impl Into<String>) {
        self.state()
            .responses
            .push((prompt_contains.into(), response.into()));
    }

    /// Every `(system, user)` prompt pair received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.state().prompts.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TextGenerationAdapter for MockTextAdapter {
    fn model_info(&self) -> TextModelInfo {
        TextModelInfo {
            id: MOCK_MODEL_ID.to_string(),
            name: "Mock Text Model".to_string(),
            provider: "mock".to_string(),
            max_context_tokens: 100_000,
            supports_structured_output: true,
        }
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _options: &TextGenOptions,
    ) -> Result<TextGenerationResponse, TextGenError> {
        let mut state = self.state();
        state
            .prompts
            .push((system_prompt.to_string(), user_prompt.to_string()));
        let text = state
            .responses
            .iter()
            .find(|(needle, _)| user_prompt.contains(needle) || system_prompt.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());

        Ok(TextGenerationResponse {
            text,
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 200,
            },
            stop_reason: StopReason::EndTurn,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde::Deserialize;

    use super::*;
    use crate::structured::generate_structured;

    #[derive(Debug, Deserialize)]
    struct Doc {
        n: u32,
    }

    #[tokio::test]
    async fn matches_needle_in_either_prompt() {
        let mock = MockTextAdapter::new();
        mock.set_response("outline", r#"{"n": 1}"#);
        let doc: Doc = generate_structured(&mock, "write an outline", "topic", &TextGenOptions::default())
            .await
            .unwrap();
        assert_eq!(doc.n, 1);
        assert_eq!(mock.prompts().len(), 1);
        assert!(mock.prompts()[0].0.contains("JSON only"));
    }

    #[tokio::test]
    async fn fallback_text_is_not_json() {
        let mock = MockTextAdapter::new();
        let result: Result<Doc, _> =
            generate_structured(&mock, "s", "u", &TextGenOptions::default()).await;
        assert_matches!(result, Err(TextGenError::MalformedResponse { .. }));
    }
}
