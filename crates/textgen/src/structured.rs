//! JSON-only responses.

use serde::de::DeserializeOwned;

use crate::adapter::{TextGenOptions, TextGenerationAdapter};
use crate::error::TextGenError;

const JSON_ONLY_INSTRUCTION: &str = "IMPORTANT: Respond with valid JSON only. \
No Markdown code fences, no commentary, just the raw JSON object.";

/// Ask `adapter` for a JSON document and deserialize it into `T`.
pub async fn generate_structured<T: DeserializeOwned>(
    adapter: &dyn TextGenerationAdapter,
    system_prompt: &str,
    user_prompt: &str,
    options: &TextGenOptions,
) -> Result<T, TextGenError> {
    let system = format!("{system_prompt}\n\n{JSON_ONLY_INSTRUCTION}");
    let response = adapter.generate_text(&system, user_prompt, options).await?;
    parse_structured(&response.text)
}

/// Parse a model response as JSON, tolerating only a surrounding Markdown
/// code fence.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, TextGenError> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|e| TextGenError::malformed(e, body))
}

fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
