use super::coordinator::WorkerError;
use super::{DependencyCountRow, DependentRepositoryRow, ManifestDependencyRow, Store, WriteBatch, fan_out};
use crate::graph::{Dependency, Manifest, Snapshot};
use core::mem;
use ohno::EnrichableExt;
use tokio_util::sync::CancellationToken;

/// Accumulates the three derived writes of one manifest's dependencies.
///
/// Each accumulator is flushed to the store as soon as it holds `batch_size` rows, and
/// once more by [`BatchWriter::finish`]. A flush is skipped once cancellation has been
/// requested, and nothing already flushed is undone.
pub(super) struct BatchWriter<'a, S> {
    store: &'a S,
    keyspace: &'a str,
    batch_size: usize,
    cancel: &'a CancellationToken,
    facts: Vec<ManifestDependencyRow>,
    dependents: Vec<DependentRepositoryRow>,
    counts: Vec<DependencyCountRow>,
    written: usize,
}

impl<'a, S: Store> BatchWriter<'a, S> {
    pub fn new(store: &'a S, keyspace: &'a str, batch_size: usize, cancel: &'a CancellationToken) -> Self {
        Self {
            store,
            keyspace,
            batch_size,
            cancel,
            facts: Vec::with_capacity(batch_size),
            dependents: Vec::with_capacity(batch_size),
            counts: Vec::with_capacity(batch_size),
            written: 0,
        }
    }

    /// Queue the writes for one dependency, flushing any accumulator that is full
    pub async fn push(&mut self, snapshot: &Snapshot, manifest: &Manifest, dependency: &Dependency) -> Result<(), WorkerError> {
        let (fact, dependent, count) = fan_out(snapshot, manifest, dependency);
        self.facts.push(fact);
        self.dependents.push(dependent);
        self.counts.push(count);
        self.written += 1;

        if self.facts.len() >= self.batch_size {
            let rows = mem::take(&mut self.facts);
            self.flush(WriteBatch::ManifestDependencies(rows)).await?;
        }

        if self.dependents.len() >= self.batch_size {
            let rows = mem::take(&mut self.dependents);
            self.flush(WriteBatch::DependentRepositories(rows)).await?;
        }

        if self.counts.len() >= self.batch_size {
            let rows = mem::take(&mut self.counts);
            self.flush(WriteBatch::DependentRepositoryCounts(rows)).await?;
        }

        Ok(())
    }

    /// Flush whatever is still queued and return the number of dependencies pushed
    pub async fn finish(mut self) -> Result<usize, WorkerError> {
        let facts = mem::take(&mut self.facts);
        let dependents = mem::take(&mut self.dependents);
        let counts = mem::take(&mut self.counts);

        self.flush(WriteBatch::ManifestDependencies(facts)).await?;
        self.flush(WriteBatch::DependentRepositories(dependents)).await?;
        self.flush(WriteBatch::DependentRepositoryCounts(counts)).await?;

        Ok(self.written)
    }

    async fn flush(&self, batch: WriteBatch) -> Result<(), WorkerError> {
        if batch.is_empty() {
            return Ok(());
        }

        if self.cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let table = batch.table();
        let len = batch.len();
        self.store
            .execute_batch(self.keyspace, batch)
            .await
            .map_err(|e| e.enrich_with(|| format!("flushing {len} {table} entries")))?;

        Ok(())
    }
}
