use std::sync::Arc;

use picturebook_core::observability::Observability;
use picturebook_events::{EventBus, Telemetry, TextCache};
use picturebook_imagegen::{GeminiAdapter, ImageGenerationAdapter, MockImageAdapter};
use picturebook_pipeline::{IllustrationOrchestrator, ManuscriptService, OutlineService, ProjectService};
use picturebook_storage::{FilesystemStorage, StorageAdapter};
use picturebook_textgen::{AnthropicAdapter, MockTextAdapter, TextGenerationAdapter};

use crate::config::{ImageProvider, ServerConfig, TextProvider};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or a handle around one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<dyn StorageAdapter>,
    /// Domain events recorded by the pipeline are published here.
    pub event_bus: Arc<EventBus>,
    pub illustrations: IllustrationOrchestrator,
    pub outlines: Arc<OutlineService>,
    pub manuscripts: Arc<ManuscriptService>,
    pub projects: Arc<ProjectService>,
}

impl AppState {
    /// Wire services around explicit collaborators.
    pub fn new(
        config: ServerConfig,
        storage: Arc<dyn StorageAdapter>,
        images: Arc<dyn ImageGenerationAdapter>,
        text: Arc<dyn TextGenerationAdapter>,
        event_bus: Arc<EventBus>,
        observability: Arc<dyn Observability>,
    ) -> Self {
        Self {
            illustrations: IllustrationOrchestrator::new(
                images,
                Arc::clone(&storage),
                Arc::clone(&observability),
            ),
            outlines: Arc::new(OutlineService::new(
                Arc::clone(&text),
                Arc::clone(&storage),
                Arc::clone(&observability),
            )),
            manuscripts: Arc::new(ManuscriptService::new(
                text,
                Arc::clone(&storage),
                observability,
            )),
            projects: Arc::new(ProjectService::new(Arc::clone(&storage))),
            config: Arc::new(config),
            storage,
            event_bus,
        }
    }

    /// Build the production state: filesystem storage, telemetry over the
    /// event bus, and the configured providers. A selected provider without
    /// its API key falls back to the mock with a warning.
    pub fn from_config(mut config: ServerConfig) -> Self {
        if config.image_provider == ImageProvider::Gemini && config.google_api_key.is_none() {
            tracing::warn!("GOOGLE_AI_API_KEY not set, using mock image provider");
            config.image_provider = ImageProvider::Mock;
        }
        if config.text_provider == TextProvider::Anthropic && config.anthropic_api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set, using mock text provider");
            config.text_provider = TextProvider::Mock;
        }

        let event_bus = Arc::new(EventBus::default());
        let cache = config
            .cache
            .enabled
            .then(|| TextCache::new(&config.cache.path, config.cache.ttl_days));
        let observability: Arc<dyn Observability> =
            Arc::new(Telemetry::new(Arc::clone(&event_bus), cache));
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(FilesystemStorage::new(&config.projects_path));

        let images: Arc<dyn ImageGenerationAdapter> = match &config.google_api_key {
            Some(key) if config.image_provider == ImageProvider::Gemini => Arc::new(
                GeminiAdapter::new(key.clone(), config.default_image_model.clone()),
            ),
            _ => Arc::new(MockImageAdapter::new()),
        };
        let text: Arc<dyn TextGenerationAdapter> = match &config.anthropic_api_key {
            Some(key) if config.text_provider == TextProvider::Anthropic => {
                Arc::new(AnthropicAdapter::new(
                    key.clone(),
                    config.default_text_model.clone(),
                    Arc::clone(&observability),
                ))
            }
            _ => Arc::new(MockTextAdapter::new()),
        };

        tracing::info!(
            image_provider = config.image_provider.as_str(),
            image_model = %images.model_info().id,
            text_provider = config.text_provider.as_str(),
            text_model = %text.model_info().id,
            projects_path = %config.projects_path.display(),
            "Providers configured"
        );

        Self::new(config, storage, images, text, event_bus, observability)
    }
}
