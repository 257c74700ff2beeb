//! Gemini `generateContent` image adapter.
//!
//! Each call sends one user turn whose parts are, per reference, a text
//! label followed by the inline image, and finally the prompt. Within a
//! session the most recent turns are replayed as prior conversation so the
//! model keeps its style.

use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use picturebook_core::illustration::ReferenceImage;
use serde_json::{json, Value};

use crate::adapter::{
    GeneratedImage, ImageGenOptions, ImageGenerationAdapter, ImageMetadata, ImageModelInfo,
    MAX_REFERENCE_IMAGES,
};
use crate::error::ImageGenError;
use crate::session::{GenerationSession, SessionTurn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Turns replayed from the session history on each call.
const MAX_SESSION_TURNS: usize = 2;

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, model)
    }

    /// Create an adapter reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(
        &self,
        body: &Value,
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let payload: Value = Self::parse_response(response).await?;
        let (data, mime_type) = extract_image(&payload)?;
        let generation_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(
            model = %self.model,
            bytes = data.len(),
            generation_time_ms,
            "Gemini image generated"
        );

        Ok(GeneratedImage {
            data,
            mime_type,
            metadata: ImageMetadata {
                model: self.model.clone(),
                aspect_ratio: options.aspect_ratio,
                generation_time_ms,
            },
        })
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ImageGenError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ImageGenError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ImageGenerationAdapter for GeminiAdapter {
    fn model_info(&self) -> ImageModelInfo {
        ImageModelInfo {
            id: self.model.clone(),
            name: if self.model.contains("flash") {
                "Gemini Flash Image".to_string()
            } else {
                "Gemini Pro Image".to_string()
            },
            provider: "google".to_string(),
            supports_text_rendering: true,
            supports_references: true,
            max_references: MAX_REFERENCE_IMAGES,
        }
    }

    async fn generate_with_references(
        &self,
        session: &mut GenerationSession,
        prompt: &str,
        references: &[ReferenceImage],
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        let message_index = session.next_message();
        let references = &references[..references.len().min(MAX_REFERENCE_IMAGES)];
        let body = build_request(session.history(), prompt, references, options);

        tracing::debug!(
            session_id = %session.id(),
            message_index,
            references = references.len(),
            "Sending Gemini session request"
        );

        let image = self.send(&body, options).await?;
        session.push_turn(
            SessionTurn {
                prompt: prompt.to_string(),
                image: image.data.clone(),
                mime_type: image.mime_type.clone(),
            },
            MAX_SESSION_TURNS,
        );
        Ok(image)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        let body = build_request(&[], prompt, &[], options);
        self.send(&body, options).await
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn inline_part(mime_type: &str, data: &[u8]) -> Value {
    json!({
        "inlineData": {
            "mimeType": mime_type,
            "data": BASE64.encode(data),
        }
    })
}

/// Build the `generateContent` request body.
pub fn build_request(
    history: &[SessionTurn],
    prompt: &str,
    references: &[ReferenceImage],
    options: &ImageGenOptions,
) -> Value {
    let mut contents = Vec::with_capacity(history.len() * 2 + 1);
    for turn in history {
        contents.push(json!({ "role": "user", "parts": [{ "text": turn.prompt }] }));
        contents.push(json!({
            "role": "model",
            "parts": [inline_part(&turn.mime_type, &turn.image)],
        }));
    }

    let mut parts = Vec::with_capacity(references.len() * 2 + 1);
    for reference in references {
        parts.push(json!({ "text": format!("Reference image: {}", reference.label) }));
        parts.push(inline_part(&reference.mime_type, &reference.data));
    }
    parts.push(json!({ "text": prompt }));
    contents.push(json!({ "role": "user", "parts": parts }));

    json!({
        "contents": contents,
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": options.aspect_ratio.as_str() },
        },
    })
}

/// Pull the first inline image out of a `generateContent` response.
pub fn extract_image(payload: &Value) -> Result<(Vec<u8>, String), ImageGenError> {
    let parts = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array);

    let Some(parts) = parts else {
        let reason = payload
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .unwrap_or("response had no candidates");
        return Err(ImageGenError::NoImage(reason.to_string()));
    };

    for part in parts {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let Some(data) = inline.get("data").and_then(Value::as_str) else {
            continue;
        };
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        return Ok((BASE64.decode(data.as_bytes())?, mime_type));
    }

    let text: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    Err(ImageGenError::NoImage(if text.is_empty() {
        "candidate had no image part".to_string()
    } else {
        text.join(" ")
    }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use picturebook_core::illustration::ReferenceKind;
    use picturebook_core::project::AspectRatio;

    use super::*;

    fn options() -> ImageGenOptions {
        ImageGenOptions {
            aspect_ratio: AspectRatio::Portrait3x4,
        }
    }

    #[test]
    fn request_interleaves_reference_labels_and_images() {
        let refs = vec![
            ReferenceImage {
                kind: ReferenceKind::Style,
                label: "Front cover".into(),
                data: vec![1, 2, 3],
                mime_type: "image/png".into(),
                source_path: None,
            },
            ReferenceImage {
                kind: ReferenceKind::PreviousPage,
                label: "Page 1".into(),
                data: vec![4],
                mime_type: "image/jpeg".into(),
                source_path: None,
            },
        ];
        let body = build_request(&[], "draw", &refs, &options());
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0]["text"], "Reference image: Front cover");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], BASE64.encode([1, 2, 3]));
        assert_eq!(parts[3]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[4]["text"], "draw");
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
    }

    #[test]
    fn request_replays_session_history_first() {
        let history = vec![SessionTurn {
            prompt: "cover".into(),
            image: vec![9],
            mime_type: "image/png".into(),
        }];
        let body = build_request(&history, "page", &[], &options());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "page");
    }

    #[test]
    fn extract_image_decodes_first_inline_part() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": BASE64.encode(b"png")}}
                ]}
            }]
        });
        let (data, mime) = extract_image(&payload).unwrap();
        assert_eq!(data, b"png");
        assert_eq!(mime, "image/png");
    }

    #[test]
    fn extract_image_reports_text_only_responses() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "I cannot draw that"}]}}]
        });
        assert_matches!(
            extract_image(&payload),
            Err(ImageGenError::NoImage(msg)) if msg.contains("cannot draw")
        );
    }

    #[test]
    fn extract_image_reports_blocked_prompts() {
        let payload = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_matches!(extract_image(&payload), Err(ImageGenError::NoImage(msg)) if msg == "SAFETY");
    }

    #[test]
    fn extract_image_rejects_bad_base64() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "!!!"}}]}}]
        });
        assert_matches!(extract_image(&payload), Err(ImageGenError::Decode(_)));
    }
}
