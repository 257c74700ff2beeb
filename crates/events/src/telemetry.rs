//! Production [`Observability`]: structured logs, bus events, text cache.

use std::sync::Arc;

use async_trait::async_trait;
use picturebook_core::observability::Observability;
use serde_json::Value;

use crate::bus::{DomainEvent, EventBus};
use crate::cache::TextCache;

pub struct Telemetry {
    bus: Arc<EventBus>,
    /// `None` when caching is disabled.
    cache: Option<TextCache>,
}

impl Telemetry {
    pub fn new(bus: Arc<EventBus>, cache: Option<TextCache>) -> Self {
        Self { bus, cache }
    }
}

#[async_trait]
impl Observability for Telemetry {
    fn record_event(&self, name: &str, payload: Value) {
        tracing::info!(event = %name, payload = %payload, "Domain event");

        let mut event = DomainEvent::new(name);
        if let Some(project_id) = payload.get("projectId").and_then(Value::as_str) {
            event = event.with_project(project_id);
        }
        self.bus.publish(event.with_payload(payload));
    }

    async fn get_text_cache(&self, key: &str) -> Option<String> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn set_text_cache(&self, key: &str, value: &str) {
        if let Some(cache) = &self.cache {
            cache.set(key, value).await;
        }
    }
}
