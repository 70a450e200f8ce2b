//! Offline cache controller.
//!
//! ### Triggers
//! - `setup`: open the current generation and pre-cache the manifest
//!   (best-effort, bounded concurrency).
//! - `activate`: delete every generation except the current one and claim
//!   interception.
//! - `intercept`: cache-first lookup, network on miss, offline fallback
//!   document for navigations.
//!
//! ### Lifecycle
//! `Parsed -> Installing -> Installed -> Activating -> Activated`. Setup
//! skips the waiting phase, so an installed controller can be activated
//! immediately. Until activation completes every request passes through to
//! the network.
//!
//! ### Background writes
//! Network responses are stored by detached tasks. `settle` waits for them;
//! nothing else does.

mod activate;
mod install;
mod intercept;
pub mod observer;

#[cfg(test)]
mod testing;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use shellcache_core::{AppConfig, CacheDb, Error, MatchMode};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, resolve, resolve_all};

pub use activate::{ActivateReport, PurgeFailure};
pub use install::{AssetFailure, SetupReport};
pub use intercept::{Interception, ResponseSource, is_cacheable};
pub use observer::{CacheEvent, CacheObserver, TracingObserver};

/// Immutable controller configuration, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name of the current generation.
    pub generation: String,
    /// Absolute URLs pre-cached by setup, in manifest order.
    pub manifest: Vec<Url>,
    /// Documents tried, in order, for offline navigations.
    pub fallback_documents: Vec<Url>,
    pub match_mode: MatchMode,
    pub setup_concurrency: usize,
}

impl ControllerConfig {
    /// Resolve the deploy-time configuration against the application base URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the base URL or any manifest or
    /// fallback identifier cannot be resolved.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let base = config.base_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = resolve_all(&base, &config.manifest).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let fallback_documents = config
            .fallback_documents
            .iter()
            .map(|doc| resolve(&base, doc))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            generation: config.generation_name(),
            manifest,
            fallback_documents,
            match_mode: config.match_mode,
            setup_concurrency: config.setup_concurrency.max(1),
        })
    }
}

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Parsed => "parsed",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
        };
        f.write_str(s)
    }
}

/// Snapshot of the controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lifecycle {
    pub phase: Phase,
    /// Still waiting for the previous controller to be released.
    pub waiting: bool,
    /// Controls all in-scope clients, not only future ones.
    pub clients_claimed: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { phase: Phase::Parsed, waiting: true, clients_claimed: false }
    }
}

/// The offline cache controller.
///
/// Cheap to clone; clones share the store, network, observer, lifecycle and
/// background write set.
#[derive(Clone)]
pub struct OfflineController {
    config: Arc<ControllerConfig>,
    db: CacheDb,
    network: Arc<dyn Network>,
    observer: Arc<dyn CacheObserver>,
    lifecycle: Arc<RwLock<Lifecycle>>,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl OfflineController {
    /// Create a controller that reports to `TracingObserver`.
    pub fn new(config: ControllerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            network,
            observer: Arc::new(TracingObserver),
            lifecycle: Arc::new(RwLock::new(Lifecycle::default())),
            pending: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Name of the current generation.
    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }

    /// Wait for every outstanding background store to finish, including
    /// ones spawned while waiting.
    ///
    /// The write set is swapped out before draining, so intercepts that
    /// spawn new stores are never blocked by a running settle.
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.pending.lock().await);
            if pending.is_empty() {
                break;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "background store task did not complete");
                }
            }
        }
    }

    fn emit(&self, event: CacheEvent) {
        self.observer.on_event(&event);
    }

    async fn set_phase(&self, phase: Phase) {
        self.lifecycle.write().await.phase = phase;
    }

    /// Detach a task into the background write set.
    async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(task);
    }
}
