use crate::services::record_store::RecordStore;
use crate::services::storage::StorageService;
use crate::utils::naming::is_attachment_path;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: Vec<String>,
    /// Unreferenced but younger than the grace period.
    pub skipped_recent: usize,
    /// Objects not shaped like attachment paths; never touched.
    pub skipped_foreign: usize,
    pub errors: usize,
}

/// Deletes storage objects that no attachment record references.
///
/// Objects younger than the grace period are left alone: an attach in flight
/// writes its bytes before its record. Only `<owner-kind>/<token>[.ext]`
/// paths are considered, so unrelated files on a shared disk survive.
pub struct OrphanSweeper {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn StorageService>,
    grace: ChronoDuration,
}

impl OrphanSweeper {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn StorageService>,
        grace_hours: u64,
    ) -> Self {
        Self {
            records,
            storage,
            grace: i64::try_from(grace_hours)
                .ok()
                .and_then(ChronoDuration::try_hours)
                .unwrap_or(ChronoDuration::MAX),
        }
    }

    pub fn with_grace(mut self, grace: ChronoDuration) -> Self {
        self.grace = grace;
        self
    }

    pub async fn sweep(&self, prefix: &str) -> anyhow::Result<SweepReport> {
        tracing::info!("🧹 Sweeping orphaned objects under '{}'", prefix);

        // `None` when the grace period reaches past the earliest datetime.
        let cutoff = Utc::now().checked_sub_signed(self.grace);
        let mut report = SweepReport::default();

        for path in self.storage.list(prefix).await? {
            report.scanned += 1;

            if !is_attachment_path(&path) {
                report.skipped_foreign += 1;
                continue;
            }

            match self.records.find_by_path(&path).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to look up record for {}: {}", path, e);
                    report.errors += 1;
                    continue;
                }
            }

            let metadata = match self.storage.get_object_metadata(&path).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!("Failed to stat {}: {}", path, e);
                    report.errors += 1;
                    continue;
                }
            };

            // Unknown modification time counts as recent.
            let old_enough = match (metadata.last_modified, cutoff) {
                (Some(at), Some(cutoff)) => at <= cutoff,
                _ => false,
            };
            if !old_enough {
                report.skipped_recent += 1;
                continue;
            }

            match self.storage.delete(&path).await {
                Ok(_) => {
                    tracing::info!("Removed orphaned object {}", path);
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::error!("Failed to remove orphaned object {}: {}", path, e);
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            "✅ Sweep finished: scanned={}, removed={}, recent={}, foreign={}, errors={}",
            report.scanned,
            report.removed.len(),
            report.skipped_recent,
            report.skipped_foreign,
            report.errors
        );
        Ok(report)
    }
}

/// Runs the sweep on an interval until shutdown is signalled.
pub struct BackgroundWorker {
    sweeper: OrphanSweeper,
    prefix: String,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(sweeper: OrphanSweeper, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            sweeper,
            prefix: String::new(),
            interval,
            shutdown,
        }
    }

    /// Restricts each sweep to objects under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Background worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    if let Err(e) = self.sweeper.sweep(&self.prefix).await {
                        tracing::error!("❌ Orphan sweep failed: {}", e);
                    }
                }
            }
        }
    }
}
