//! Image generation providers.
//!
//! Provides the [`ImageGenerationAdapter`] trait, the owned
//! [`GenerationSession`] handle used for style continuity, a Gemini
//! HTTP adapter, and a deterministic mock adapter.

pub mod adapter;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod session;

pub use adapter::{GeneratedImage, ImageGenOptions, ImageGenerationAdapter, ImageMetadata, ImageModelInfo};
pub use error::ImageGenError;
pub use gemini::GeminiAdapter;
pub use mock::MockImageAdapter;
pub use session::GenerationSession;
