//! Observer seam for controller outcomes.
//!
//! Non-fatal failures (manifest fetches, background stores, stale purges)
//! never reach the caller of the trigger that produced them; they are
//! reported here instead.

/// Something the controller did or failed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    GenerationOpened { generation: String, created: bool },
    AssetCached { url: String },
    AssetFailed { url: String, error: String },
    GenerationPurged { generation: String },
    PurgeFailed { generation: String, error: String },
    ServedFromCache { url: String },
    ServedFallback { url: String, document: String },
    EntryStored { key: String },
    StoreFailed { key: String, error: String },
}

impl CacheEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CacheEvent::AssetFailed { .. } | CacheEvent::PurgeFailed { .. } | CacheEvent::StoreFailed { .. }
        )
    }
}

/// Receives controller events. Must not block.
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

/// Default observer: structured logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::GenerationOpened { generation, created } => {
                tracing::info!(generation = %generation, created, "opened cache generation");
            }
            CacheEvent::AssetCached { url } => tracing::debug!(url = %url, "cached app asset"),
            CacheEvent::AssetFailed { url, error } => {
                tracing::warn!(url = %url, error = %error, "failed to cache app asset");
            }
            CacheEvent::GenerationPurged { generation } => {
                tracing::info!(generation = %generation, "purged legacy cache generation");
            }
            CacheEvent::PurgeFailed { generation, error } => {
                tracing::warn!(generation = %generation, error = %error, "failed to purge cache generation");
            }
            CacheEvent::ServedFromCache { url } => tracing::debug!(url = %url, "served from cache"),
            CacheEvent::ServedFallback { url, document } => {
                tracing::info!(url = %url, document = %document, "served offline fallback document");
            }
            CacheEvent::EntryStored { key } => tracing::debug!(key = %key, "stored network response"),
            CacheEvent::StoreFailed { key, error } => {
                tracing::warn!(key = %key, error = %error, "failed to store network response");
            }
        }
    }
}
