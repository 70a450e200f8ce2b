//! Setup trigger: open the current generation and pre-cache the manifest.

use std::sync::Arc;

use serde::Serialize;
use shellcache_core::{Error, InterceptRequest, RequestKey, RequestMode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::{CacheEvent, OfflineController, Phase};

/// A manifest asset that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a setup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub generation: String,
    /// The generation did not exist before this run.
    pub created: bool,
    /// Cached assets, in manifest order.
    pub cached: Vec<String>,
    /// Assets skipped, in manifest order.
    pub failed: Vec<AssetFailure>,
}

impl OfflineController {
    /// Open the current generation and fetch every manifest asset into it.
    ///
    /// Best-effort: a failing asset is reported and skipped, and setup still
    /// completes. On return the controller is installed and no longer
    /// waiting, so it can be activated right away.
    ///
    /// On an activated controller this only re-populates the generation;
    /// interception stays on throughout.
    ///
    /// # Errors
    ///
    /// Returns an error only if the generation itself cannot be opened; the
    /// controller is then back in `Phase::Parsed`, or still `Activated`.
    pub async fn setup(&self) -> Result<SetupReport, Error> {
        let active = {
            let mut lifecycle = self.lifecycle.write().await;
            let active = lifecycle.phase == Phase::Activated;
            if !active {
                lifecycle.phase = Phase::Installing;
            }
            active
        };

        let generation = self.config.generation.clone();
        let created = match self.db.open_generation(&generation).await {
            Ok(created) => created,
            Err(e) => {
                if !active {
                    self.set_phase(Phase::Parsed).await;
                }
                return Err(e);
            }
        };
        self.emit(CacheEvent::GenerationOpened { generation: generation.clone(), created });

        tracing::info!(generation = %generation, assets = self.config.manifest.len(), "caching app assets");

        let semaphore = Arc::new(Semaphore::new(self.config.setup_concurrency));
        let mut join_set = JoinSet::new();

        for (index, url) in self.config.manifest.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let this = self.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = this.cache_asset(&url).await;
                (index, url, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.config.manifest.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "manifest fetch task did not complete"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = SetupReport { generation, created, cached: Vec::new(), failed: Vec::new() };
        for (_, url, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    self.emit(CacheEvent::AssetCached { url: url.to_string() });
                    report.cached.push(url.to_string());
                }
                Err(e) => {
                    let failure = AssetFailure { url: url.to_string(), error: e.to_string() };
                    self.emit(CacheEvent::AssetFailed { url: failure.url.clone(), error: failure.error.clone() });
                    report.failed.push(failure);
                }
            }
        }

        if !active {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.phase = Phase::Installed;
            lifecycle.waiting = false;
        }

        tracing::info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            "setup complete"
        );

        Ok(report)
    }

    async fn cache_asset(&self, url: &Url) -> Result<(), Error> {
        let request = InterceptRequest::new("GET", url.clone(), RequestMode::Cors);
        let response = self.network.fetch(&request).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("status {}", response.status)));
        }
        self.db
            .put_entry(&self.config.generation, &RequestKey::from_url(url), &response)
            .await
    }
}
