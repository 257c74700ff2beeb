//! File-backed text response cache with a per-entry TTL.
//!
//! Entries live at `{root}/text/{key}.json`. Cache failures are logged and
//! treated as misses; they never fail the caller.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    data: String,
    /// Milliseconds since the Unix epoch.
    created_at: i64,
    ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct TextCache {
    dir: PathBuf,
    ttl_days: i64,
}

impl TextCache {
    pub fn new(root: impl Into<PathBuf>, ttl_days: i64) -> Self {
        Self {
            dir: root.into().join("text"),
            ttl_days,
        }
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        // Keys are hex digests; anything else is refused.
        key.chars()
            .all(|c| c.is_ascii_alphanumeric())
            .then(|| self.dir.join(format!("{key}.json")))
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key)?;
        let raw = fs::read(&path).await.ok()?;
        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Discarding corrupt cache entry");
                let _ = fs::remove_file(&path).await;
                return None;
            }
        };

        let age = Utc::now().timestamp_millis().saturating_sub(entry.created_at);
        // A TTL too large to represent is treated as expired.
        let expired = match Duration::try_days(entry.ttl_days) {
            Some(ttl) => age > ttl.num_milliseconds(),
            None => true,
        };
        if expired {
            let _ = fs::remove_file(&path).await;
            return None;
        }
        tracing::debug!(cache_key = %key, "Cache hit");
        Some(entry.data)
    }

    pub async fn set(&self, key: &str, value: &str) {
        let Some(path) = self.entry_path(key) else {
            return;
        };
        let entry = CacheEntry {
            data: value.to_string(),
            created_at: Utc::now().timestamp_millis(),
            ttl_days: self.ttl_days,
        };
        let result = async {
            fs::create_dir_all(&self.dir).await?;
            let json = serde_json::to_vec(&entry).map_err(std::io::Error::other)?;
            fs::write(&path, json).await
        }
        .await;
        match result {
            Ok(()) => tracing::debug!(cache_key = %key, "Cache set"),
            Err(e) => tracing::warn!(cache_key = %key, error = %e, "Failed to write cache entry"),
        }
    }

    /// Remove every cached entry.
    pub async fn clear(&self) {
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "Failed to clear text cache");
            }
        }
    }
}
