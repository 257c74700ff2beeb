//! Deterministic in-process image adapter.
//!
//! Returns a 1x1 PNG for every call and records what it was asked to do.
//! Used by tests and as the keyless development provider.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use picturebook_core::illustration::{ReferenceImage, ReferenceImageInfo};
use picturebook_core::project::AspectRatio;

use crate::adapter::{
    GeneratedImage, ImageGenOptions, ImageGenerationAdapter, ImageMetadata, ImageModelInfo,
    MAX_REFERENCE_IMAGES,
};
use crate::error::ImageGenError;
use crate::session::GenerationSession;

pub const MOCK_MODEL_ID: &str = "mock-image-model";

/// A transparent 1x1 PNG.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0xf8, 0x5f, 0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `generate_with_references` inside a session.
    Session,
    /// Reference-free `generate_image`.
    Standalone,
}

/// One generation call as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub session_id: Option<String>,
    pub message_index: Option<u32>,
    pub prompt: String,
    pub references: Vec<ReferenceImageInfo>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    opened_sessions: Vec<String>,
    closed_sessions: Vec<String>,
    fail_on_call: Option<usize>,
}

#[derive(Debug, Default)]
pub struct MockImageAdapter {
    state: Mutex<MockState>,
    latency: Option<Duration>,
    aspect_ratios: Option<Vec<AspectRatio>>,
}

impl MockImageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th generation call (1-based, both kinds counted).
    pub fn failing_on_call(self, n: usize) -> Self {
        self.set_fail_on_call(Some(n));
        self
    }

    /// Sleep this long inside every generation call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Restrict the aspect ratios the mock claims to support.
    pub fn with_aspect_ratios(mut self, ratios: Vec<AspectRatio>) -> Self {
        self.aspect_ratios = Some(ratios);
        self
    }

    pub fn set_fail_on_call(&self, n: Option<usize>) {
        self.state().fail_on_call = n;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn opened_sessions(&self) -> Vec<String> {
        self.state().opened_sessions.clone()
    }

    pub fn closed_sessions(&self) -> Vec<String> {
        self.state().closed_sessions.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn record(&self, call: RecordedCall, options: &ImageGenOptions) -> Result<GeneratedImage, ImageGenError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let number = {
            let mut state = self.state();
            state.calls.push(call);
            state.calls.len()
        };
        if self.state().fail_on_call == Some(number) {
            return Err(ImageGenError::Provider(format!(
                "simulated failure on call {number}"
            )));
        }

        Ok(GeneratedImage {
            data: PLACEHOLDER_PNG.to_vec(),
            mime_type: "image/png".to_string(),
            metadata: ImageMetadata {
                model: MOCK_MODEL_ID.to_string(),
                aspect_ratio: options.aspect_ratio,
                generation_time_ms: self
                    .latency
                    .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            },
        })
    }
}

#[async_trait]
impl ImageGenerationAdapter for MockImageAdapter {
    fn model_info(&self) -> ImageModelInfo {
        ImageModelInfo {
            id: MOCK_MODEL_ID.to_string(),
            name: "Mock Image Model".to_string(),
            provider: "mock".to_string(),
            supports_text_rendering: true,
            supports_references: true,
            max_references: MAX_REFERENCE_IMAGES,
        }
    }

    fn supported_aspect_ratios(&self) -> Vec<AspectRatio> {
        match &self.aspect_ratios {
            Some(ratios) => ratios.clone(),
            None => vec![
                AspectRatio::Square,
                AspectRatio::Portrait3x4,
                AspectRatio::Landscape4x3,
                AspectRatio::Portrait2x3,
                AspectRatio::Landscape3x2,
            ],
        }
    }

    async fn create_session(&self, project_id: &str) -> GenerationSession {
        let session = GenerationSession::open(project_id);
        self.state().opened_sessions.push(session.id().to_string());
        session
    }

    async fn generate_with_references(
        &self,
        session: &mut GenerationSession,
        prompt: &str,
        references: &[ReferenceImage],
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        let message_index = session.next_message();
        let call = RecordedCall {
            kind: CallKind::Session,
            session_id: Some(session.id().to_string()),
            message_index: Some(message_index),
            prompt: prompt.to_string(),
            references: references.iter().map(ReferenceImage::info).collect(),
        };
        self.record(call, options).await
    }

    async fn close_session(&self, session: GenerationSession) {
        self.state().closed_sessions.push(session.id().to_string());
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError> {
        let call = RecordedCall {
            kind: CallKind::Standalone,
            session_id: None,
            message_index: None,
            prompt: prompt.to_string(),
            references: Vec::new(),
        };
        self.record(call, options).await
    }
}
