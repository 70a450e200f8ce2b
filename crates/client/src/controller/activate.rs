//! Activation trigger: drop superseded generations and claim interception.

use serde::Serialize;
use shellcache_core::Error;

use super::{CacheEvent, OfflineController, Phase};

/// A stale generation that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeFailure {
    pub generation: String,
    pub error: String,
}

/// Outcome of an activation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    pub purged: Vec<String>,
    pub failed: Vec<PurgeFailure>,
}

impl OfflineController {
    /// Delete every generation other than the current one, then take over
    /// interception for all clients.
    ///
    /// A generation that fails to delete is reported and skipped; the rest
    /// are still purged and activation completes. Running it again with
    /// nothing stale is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInstalled` if setup has not completed, or the store
    /// error if generations cannot be enumerated.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = {
            let mut lifecycle = self.lifecycle.write().await;
            match lifecycle.phase {
                Phase::Installed | Phase::Activated => {
                    let previous = lifecycle.phase;
                    lifecycle.phase = Phase::Activating;
                    previous
                }
                other => return Err(Error::NotInstalled(format!("cannot activate while {other}"))),
            }
        };

        let current = self.config.generation.clone();
        let names = match self.db.generation_names().await {
            Ok(names) => names,
            Err(e) => {
                self.set_phase(previous).await;
                return Err(e);
            }
        };

        let mut report = ActivateReport { generation: current.clone(), purged: Vec::new(), failed: Vec::new() };
        for name in names.into_iter().filter(|name| *name != current) {
            match self.db.delete_generation(&name).await {
                Ok(true) => {
                    self.emit(CacheEvent::GenerationPurged { generation: name.clone() });
                    report.purged.push(name);
                }
                Ok(false) => tracing::debug!(generation = %name, "generation already removed"),
                Err(e) => {
                    let failure = PurgeFailure { generation: name, error: e.to_string() };
                    self.emit(CacheEvent::PurgeFailed {
                        generation: failure.generation.clone(),
                        error: failure.error.clone(),
                    });
                    report.failed.push(failure);
                }
            }
        }

        {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.phase = Phase::Activated;
            lifecycle.clients_claimed = true;
        }

        tracing::info!(generation = %current, purged = report.purged.len(), "controller activated");

        Ok(report)
    }
}
