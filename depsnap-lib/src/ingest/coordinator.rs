use super::batch_writer::BatchWriter;
use super::{ManifestRow, NoProgress, Progress, SnapshotRow, Statement, Store, TicketPool};
use crate::Result;
use crate::graph::Snapshot;
use core::ops::AddAssign;
use ohno::{AppError, EnrichableExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "    ingest";

/// Tuning for one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Maximum number of manifests written at once
    pub max_concurrency: usize,

    /// Accumulator size that triggers a batch flush
    pub batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            batch_size: 200,
        }
    }
}

/// What a successful ingestion run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub manifests: usize,
    pub runtime: usize,
    pub development: usize,
    pub transitives: usize,
}

impl IngestSummary {
    #[must_use]
    pub const fn dependencies(&self) -> usize {
        self.runtime + self.development + self.transitives
    }

    fn record(&mut self, written: &ManifestWritten) {
        self.manifests += 1;
        self.runtime += written.runtime;
        self.development += written.development;
        self.transitives += written.transitives;
    }
}

impl AddAssign for IngestSummary {
    fn add_assign(&mut self, other: Self) {
        self.manifests += other.manifests;
        self.runtime += other.runtime;
        self.development += other.development;
        self.transitives += other.transitives;
    }
}

/// Why a manifest worker stopped early.
///
/// Only failures are reported to the caller; a worker that noticed cancellation is
/// quietly discarded.
#[derive(Debug)]
pub(super) enum WorkerError {
    Cancelled,
    Failed(AppError),
}

impl From<AppError> for WorkerError {
    fn from(e: AppError) -> Self {
        Self::Failed(e)
    }
}

struct ManifestWritten {
    runtime: usize,
    development: usize,
    transitives: usize,
}

/// Writes whole snapshots into a [`Store`].
///
/// The snapshot row is written first and must succeed before any manifest is touched.
/// Manifests are then handed to one task each; a task holds a ticket from the shared
/// [`TicketPool`] for its whole lifetime. The first task to fail trips a cancellation
/// token so the others abandon their next store operation, and that first error is
/// what [`Ingestor::ingest`] returns once every task has finished.
pub struct Ingestor<S> {
    store: Arc<S>,
    keyspace: Arc<str>,
    settings: IngestSettings,
    tickets: Arc<TicketPool>,
    progress: Arc<dyn Progress>,
}

impl<S: Store + 'static> Ingestor<S> {
    #[must_use]
    pub fn new(store: Arc<S>, keyspace: impl Into<Arc<str>>, settings: IngestSettings) -> Self {
        Self {
            store,
            keyspace: keyspace.into(),
            tickets: TicketPool::new(settings.max_concurrency),
            settings,
            progress: Arc::new(NoProgress),
        }
    }

    /// Report per-manifest progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn tickets(&self) -> &Arc<TicketPool> {
        &self.tickets
    }

    /// Write one snapshot and all of its manifests.
    ///
    /// Writes that completed before a failure are left in place.
    pub async fn ingest(&self, snapshot: Snapshot) -> Result<IngestSummary> {
        let start = Instant::now();
        let snapshot = Arc::new(snapshot);

        self.store
            .execute(&self.keyspace, Statement::InsertSnapshot(SnapshotRow::from(snapshot.as_ref())))
            .await
            .map_err(|e| e.enrich_with(|| format!("writing snapshot {}", snapshot.id)))?;
        log::info!(target: LOG_TARGET, "Snapshot {} written", snapshot.id);

        self.progress.set_phase("Ingesting");
        self.progress.set_total(snapshot.manifests.len() as u64);

        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();
        for index in 0..snapshot.manifests.len() {
            let worker = ManifestWorker {
                store: Arc::clone(&self.store),
                keyspace: Arc::clone(&self.keyspace),
                snapshot: Arc::clone(&snapshot),
                index,
                batch_size: self.settings.batch_size,
                tickets: Arc::clone(&self.tickets),
                cancel: cancel.clone(),
            };

            let _ = workers.spawn(worker.run());
        }

        let mut summary = IngestSummary::default();
        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(WorkerError::Failed(AppError::new(e).enrich("manifest worker panicked"))));

            match outcome {
                Ok(written) => {
                    summary.record(&written);
                    self.progress.advance(1);
                }

                Err(WorkerError::Cancelled) => {}

                Err(WorkerError::Failed(e)) => {
                    if first_error.is_none() {
                        log::warn!(target: LOG_TARGET, "Cancelling ingestion of snapshot {}: {e}", snapshot.id);
                        cancel.cancel();
                        first_error = Some(e);
                    } else {
                        log::debug!(target: LOG_TARGET, "Discarding subsequent worker error: {e}");
                    }
                }
            }
        }

        self.progress.done();

        if let Some(e) = first_error {
            return Err(e.enrich(format!("ingesting snapshot {}", snapshot.id)));
        }

        log::info!(
            target: LOG_TARGET,
            "Snapshot {} ingested in {:.3}s: {} manifests, {} dependencies (runtime={}, development={}, transitive={})",
            snapshot.id,
            start.elapsed().as_secs_f64(),
            summary.manifests,
            summary.dependencies(),
            summary.runtime,
            summary.development,
            summary.transitives
        );

        Ok(summary)
    }
}

struct ManifestWorker<S> {
    store: Arc<S>,
    keyspace: Arc<str>,
    snapshot: Arc<Snapshot>,
    index: usize,
    batch_size: usize,
    tickets: Arc<TicketPool>,
    cancel: CancellationToken,
}

impl<S: Store> ManifestWorker<S> {
    async fn run(self) -> core::result::Result<ManifestWritten, WorkerError> {
        let _ticket = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(WorkerError::Cancelled),
            ticket = self.tickets.acquire() => ticket?,
        };

        let snapshot = self.snapshot.as_ref();
        let manifest = &snapshot.manifests[self.index];

        self.checkpoint()?;
        self.store
            .execute(&self.keyspace, Statement::InsertManifest(ManifestRow::new(snapshot, manifest)))
            .await
            .map_err(|e| e.enrich_with(|| format!("writing manifest {}", manifest.id)))?;
        log::info!(target: LOG_TARGET, "Manifest {} written", manifest.id);

        let mut writer = BatchWriter::new(self.store.as_ref(), &self.keyspace, self.batch_size, &self.cancel);
        for (group, dependencies) in [
            ("direct runtime", &manifest.runtime),
            ("direct development", &manifest.development),
            ("transitive", &manifest.transitives),
        ] {
            for dependency in dependencies {
                writer.push(snapshot, manifest, dependency).await.map_err(|e| match e {
                    WorkerError::Failed(e) => WorkerError::Failed(e.enrich_with(|| format!("writing dependency batches for manifest {}", manifest.id))),
                    WorkerError::Cancelled => WorkerError::Cancelled,
                })?;
            }
            log::debug!(target: LOG_TARGET, "{} {group} dependencies submitted for manifest {}", dependencies.len(), manifest.id);
        }

        let total = writer.finish().await.map_err(|e| match e {
            WorkerError::Failed(e) => WorkerError::Failed(e.enrich_with(|| format!("performing final dependency flush for manifest {}", manifest.id))),
            WorkerError::Cancelled => WorkerError::Cancelled,
        })?;
        log::info!(target: LOG_TARGET, "Total {total} dependencies written for manifest {}", manifest.id);

        Ok(ManifestWritten {
            runtime: manifest.runtime.len(),
            development: manifest.development.len(),
            transitives: manifest.transitives.len(),
        })
    }

    fn checkpoint(&self) -> core::result::Result<(), WorkerError> {
        if self.cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }
}
