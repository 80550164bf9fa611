use super::{DependencyCountRow, DependentRepositoryRow, ManifestDependencyRow, ManifestRow, SnapshotRow};
use crate::Result;
use strum::{Display, IntoStaticStr, VariantArray};

/// The five tables of the dependency-graph schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr, VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Snapshots,
    Manifests,
    ManifestDependencies,
    DependentRepositories,
    DependentRepositoryCounts,
}

impl Table {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// How the store should apply a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BatchKind {
    /// No batch log; statements may be applied partially
    Unlogged,

    /// Counter updates only
    Counter,
}

/// A single-row write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    InsertSnapshot(SnapshotRow),
    InsertManifest(ManifestRow),
}

impl Statement {
    #[must_use]
    pub const fn table(&self) -> Table {
        match self {
            Self::InsertSnapshot(_) => Table::Snapshots,
            Self::InsertManifest(_) => Table::Manifests,
        }
    }
}

/// A batch of derived rows for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteBatch {
    ManifestDependencies(Vec<ManifestDependencyRow>),
    DependentRepositories(Vec<DependentRepositoryRow>),
    DependentRepositoryCounts(Vec<DependencyCountRow>),
}

impl WriteBatch {
    #[must_use]
    pub const fn table(&self) -> Table {
        match self {
            Self::ManifestDependencies(_) => Table::ManifestDependencies,
            Self::DependentRepositories(_) => Table::DependentRepositories,
            Self::DependentRepositoryCounts(_) => Table::DependentRepositoryCounts,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> BatchKind {
        match self {
            Self::ManifestDependencies(_) | Self::DependentRepositories(_) => BatchKind::Unlogged,
            Self::DependentRepositoryCounts(_) => BatchKind::Counter,
        }
    }

    /// Whether replaying the batch leaves the store unchanged.
    ///
    /// Only the reverse index qualifies: replayed fact rows may duplicate and replayed
    /// counter increments count twice.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(self, Self::DependentRepositories(_))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::ManifestDependencies(rows) => rows.len(),
            Self::DependentRepositories(rows) => rows.len(),
            Self::DependentRepositoryCounts(rows) => rows.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The write side of a wide-column store.
///
/// Implementations are shared by every ingestion worker and must tolerate concurrent
/// calls. No call is retried by the caller.
pub trait Store: Send + Sync {
    /// Apply a single-row write within `keyspace`
    fn execute(&self, keyspace: &str, statement: Statement) -> impl Future<Output = Result<()>> + Send;

    /// Apply a batch of rows within `keyspace`
    fn execute_batch(&self, keyspace: &str, batch: WriteBatch) -> impl Future<Output = Result<()>> + Send;

    /// Run a schema statement such as `CREATE TABLE`
    fn execute_schema(&self, cql: &str) -> impl Future<Output = Result<()>> + Send;
}
