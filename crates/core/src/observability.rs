//! Injected observability seam.
//!
//! Services receive an `Arc<dyn Observability>` instead of reaching for a
//! global logger or cache, so tests can record and assert on what happened.

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Observability: Send + Sync {
    /// Record a named domain event (e.g. `illustration.generated`).
    fn record_event(&self, name: &str, payload: Value);

    /// Look up a cached text-generation response.
    async fn get_text_cache(&self, key: &str) -> Option<String>;

    /// Store a text-generation response.
    async fn set_text_cache(&self, key: &str, value: &str);
}

/// Discards events and never caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObservability;

#[async_trait]
impl Observability for NoopObservability {
    fn record_event(&self, _name: &str, _payload: Value) {}

    async fn get_text_cache(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set_text_cache(&self, _key: &str, _value: &str) {}
}
