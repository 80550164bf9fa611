use super::{DependencyCountRow, DependentRepositoryRow, ManifestDependencyRow, ManifestRow, SnapshotRow, Statement, Store, Table, WriteBatch};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A [`Store`] that keeps everything in process memory.
///
/// Records every row, batch and schema statement it receives so that dry runs can report
/// what would have been written and tests can assert on it. Rows are appended, never
/// overwritten; counters accumulate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<Table, usize>,
    batches: BTreeMap<Table, usize>,
    snapshots: Vec<SnapshotRow>,
    manifests: Vec<ManifestRow>,
    manifest_dependencies: Vec<ManifestDependencyRow>,
    dependent_repositories: Vec<DependentRepositoryRow>,
    usage: HashMap<DependencyCountRow, u64>,
    schema: Vec<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows written to `table`, counting each counter increment as one row
    #[must_use]
    pub fn rows_written(&self, table: Table) -> usize {
        self.state().rows.get(&table).copied().unwrap_or_default()
    }

    /// Number of batches applied to `table`
    #[must_use]
    pub fn batches_executed(&self, table: Table) -> usize {
        self.state().batches.get(&table).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotRow> {
        self.state().snapshots.clone()
    }

    #[must_use]
    pub fn manifests(&self) -> Vec<ManifestRow> {
        self.state().manifests.clone()
    }

    #[must_use]
    pub fn manifest_dependencies(&self) -> Vec<ManifestDependencyRow> {
        self.state().manifest_dependencies.clone()
    }

    #[must_use]
    pub fn dependent_repositories(&self) -> Vec<DependentRepositoryRow> {
        self.state().dependent_repositories.clone()
    }

    /// Current value of the `used_by` counter for a package version
    #[must_use]
    pub fn used_by(&self, key: &DependencyCountRow) -> u64 {
        self.state().usage.get(key).copied().unwrap_or_default()
    }

    /// Schema statements received so far, in order
    #[must_use]
    pub fn schema(&self) -> Vec<String> {
        self.state().schema.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    async fn execute(&self, _keyspace: &str, statement: Statement) -> Result<()> {
        let mut state = self.state();
        *state.rows.entry(statement.table()).or_default() += 1;

        match statement {
            Statement::InsertSnapshot(row) => state.snapshots.push(row),
            Statement::InsertManifest(row) => state.manifests.push(row),
        }

        Ok(())
    }

    async fn execute_batch(&self, _keyspace: &str, batch: WriteBatch) -> Result<()> {
        let mut state = self.state();
        *state.rows.entry(batch.table()).or_default() += batch.len();
        *state.batches.entry(batch.table()).or_default() += 1;

        match batch {
            WriteBatch::ManifestDependencies(rows) => state.manifest_dependencies.extend(rows),
            WriteBatch::DependentRepositories(rows) => state.dependent_repositories.extend(rows),
            WriteBatch::DependentRepositoryCounts(rows) => {
                for row in rows {
                    *state.usage.entry(row).or_default() += 1;
                }
            }
        }

        Ok(())
    }

    async fn execute_schema(&self, cql: &str) -> Result<()> {
        self.state().schema.push(cql.to_string());
        Ok(())
    }
}
