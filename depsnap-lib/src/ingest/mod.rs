//! Fan-out ingestion of generated snapshots into a wide-column store.
//!
//! A snapshot becomes one `snapshots` row, one `manifests` row per manifest, and three
//! derived writes per dependency (`manifest_dependencies`, `dependent_repositories` and
//! `dependent_repository_counts`). Manifests are written by concurrent workers that share
//! a fixed pool of tickets; the first failing worker cancels the rest.

mod batch_writer;
mod coordinator;
mod memory_store;
mod progress;
mod rows;
mod schema;
mod scylla_store;
mod store;
mod tickets;

pub use coordinator::{IngestSettings, IngestSummary, Ingestor};
pub use memory_store::MemoryStore;
pub use progress::{NoProgress, Progress};
pub use rows::{DependencyCountRow, DependentRepositoryRow, ManifestDependencyRow, ManifestRow, SnapshotRow, fan_out};
pub use schema::{is_valid_keyspace, keyspace_ddl, provision, table_ddl};
pub use scylla_store::{ScyllaStore, StoreSettings};
pub use store::{BatchKind, Statement, Store, Table, WriteBatch};
pub use tickets::{Ticket, TicketPool};
