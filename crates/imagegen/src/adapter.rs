use async_trait::async_trait;
use picturebook_core::illustration::ReferenceImage;
use picturebook_core::project::AspectRatio;
use serde::Serialize;

use crate::error::ImageGenError;
use crate::session::GenerationSession;

/// Upper bound on reference images per call.
pub const MAX_REFERENCE_IMAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGenOptions {
    pub aspect_ratio: AspectRatio,
}

impl ImageGenOptions {
    /// Options for `adapter`, rejecting an aspect ratio it cannot produce.
    pub fn for_adapter(
        adapter: &dyn ImageGenerationAdapter,
        aspect_ratio: AspectRatio,
    ) -> Result<Self, ImageGenError> {
        if !adapter.supported_aspect_ratios().contains(&aspect_ratio) {
            return Err(ImageGenError::UnsupportedAspectRatio(aspect_ratio.as_str()));
        }
        Ok(Self { aspect_ratio })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub model: String,
    pub aspect_ratio: AspectRatio,
    pub generation_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub supports_text_rendering: bool,
    pub supports_references: bool,
    pub max_references: usize,
}

/// An image generation provider.
#[async_trait]
pub trait ImageGenerationAdapter: Send + Sync {
    fn model_info(&self) -> ImageModelInfo;

    fn supported_aspect_ratios(&self) -> Vec<AspectRatio> {
        vec![
            AspectRatio::Square,
            AspectRatio::Portrait3x4,
            AspectRatio::Landscape4x3,
            AspectRatio::Portrait2x3,
            AspectRatio::Landscape3x2,
        ]
    }

    /// Open a session for a sequence of related generation calls.
    async fn create_session(&self, project_id: &str) -> GenerationSession {
        GenerationSession::open(project_id)
    }

    /// Generate within `session`, biased toward the given reference images.
    /// Increments the session's message index.
    async fn generate_with_references(
        &self,
        session: &mut GenerationSession,
        prompt: &str,
        references: &[ReferenceImage],
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError>;

    /// Release the session. Consumes it so it cannot be reused.
    async fn close_session(&self, session: GenerationSession) {
        tracing::debug!(
            session_id = %session.id(),
            messages = session.message_index(),
            open_ms = session.open_duration().num_milliseconds(),
            "Generation session closed"
        );
    }

    /// Reference-free generation outside any session.
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageGenOptions,
    ) -> Result<GeneratedImage, ImageGenError>;
}
