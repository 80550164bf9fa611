use super::{BatchKind, Statement, Store, Table, WriteBatch};
use crate::Result;
use crate::graph::Purl;
use core::time::Duration;
use ohno::IntoAppError;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::Consistency;
use scylla::statement::batch::{Batch, BatchType};
use scylla::statement::unprepared::Statement as CqlStatement;
use scylla::value::{CqlTimestamp, CqlVarint};
use std::collections::BTreeSet;

const LOG_TARGET: &str = "    scylla";

/// How to reach the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Contact points as `host:port`
    pub nodes: Vec<String>,
    pub connect_timeout: Duration,

    /// Per-request timeout enforced by the driver
    pub request_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            nodes: vec!["127.0.0.1:9042".to_string()],
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// A [`Store`] backed by a Scylla or Cassandra cluster.
///
/// Every request runs at `LOCAL_QUORUM` with the configured timeout. Nothing is retried
/// beyond what the driver's own policy does.
#[derive(Debug)]
pub struct ScyllaStore {
    session: Session,
}

impl ScyllaStore {
    /// Open a session against the configured contact points
    pub async fn connect(settings: &StoreSettings) -> Result<Self> {
        let nodes = settings.nodes.join(", ");
        log::info!(target: LOG_TARGET, "Connecting to {nodes}");

        let profile = ExecutionProfile::builder()
            .consistency(Consistency::LocalQuorum)
            .request_timeout(Some(settings.request_timeout))
            .build()
            .into_handle();

        let session = SessionBuilder::new()
            .known_nodes(&settings.nodes)
            .connection_timeout(settings.connect_timeout)
            .default_execution_profile_handle(profile)
            .build()
            .await
            .into_app_err_with(|| format!("connecting to {nodes}"))?;

        Ok(Self { session })
    }
}

impl Store for ScyllaStore {
    async fn execute(&self, keyspace: &str, statement: Statement) -> Result<()> {
        let table = statement.table();
        let cql = CqlStatement::new(write_cql(keyspace, table));

        let result = match &statement {
            Statement::InsertSnapshot(row) => {
                self.session
                    .query_unpaged(
                        cql,
                        (
                            row.id,
                            varint(row.owner_id),
                            varint(row.repository_id),
                            row.nwo.as_str(),
                            CqlTimestamp(row.created_at.timestamp_millis()),
                            row.git_ref.as_str(),
                            row.commit_oid.as_str(),
                            row.blob_url.as_str(),
                            row.source_url.as_str(),
                        ),
                    )
                    .await
            }

            Statement::InsertManifest(row) => {
                self.session
                    .query_unpaged(
                        cql,
                        (
                            row.id,
                            row.snapshot_id,
                            varint(row.owner_id),
                            varint(row.repository_id),
                            row.git_ref.as_str(),
                            row.commit_oid.as_str(),
                            row.blob_key.as_str(),
                            row.manifest_key.as_str(),
                            row.package_manager.as_str(),
                            row.project_name.as_str(),
                            row.project_version.as_str(),
                            row.project_license.as_str(),
                        ),
                    )
                    .await
            }
        };

        let _ = result.into_app_err_with(|| format!("writing to {keyspace}.{table}"))?;
        Ok(())
    }

    async fn execute_batch(&self, keyspace: &str, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let table = batch.table();
        let mut cql_batch = Batch::new(match batch.kind() {
            BatchKind::Unlogged => BatchType::Unlogged,
            BatchKind::Counter => BatchType::Counter,
        });
        cql_batch.set_is_idempotent(batch.is_idempotent());

        let cql = write_cql(keyspace, table);
        for _ in 0..batch.len() {
            cql_batch.append_statement(cql.as_str());
        }

        let result = match &batch {
            WriteBatch::ManifestDependencies(rows) => {
                let values: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        (
                            row.manifest_id,
                            row.package_manager.as_str(),
                            row.namespace.as_str(),
                            row.name.as_str(),
                            row.version.as_str(),
                            row.snapshot_id,
                            row.license.as_str(),
                            row.source_url.as_str(),
                            row.scope.as_str(),
                            row.relationship.as_str(),
                            purls(&row.runtime),
                            purls(&row.development),
                        )
                    })
                    .collect();
                self.session.batch(&cql_batch, values).await
            }

            WriteBatch::DependentRepositories(rows) => {
                let values: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        (
                            row.package_manager.as_str(),
                            row.namespace.as_str(),
                            row.name.as_str(),
                            row.version.as_str(),
                            varint(row.owner_id),
                            varint(row.repository_id),
                            row.license.as_str(),
                            row.source_url.as_str(),
                        )
                    })
                    .collect();
                self.session.batch(&cql_batch, values).await
            }

            WriteBatch::DependentRepositoryCounts(rows) => {
                let values: Vec<_> = rows
                    .iter()
                    .map(|row| (row.package_manager.as_str(), row.namespace.as_str(), row.name.as_str(), row.version.as_str()))
                    .collect();
                self.session.batch(&cql_batch, values).await
            }
        };

        let _ = result.into_app_err_with(|| format!("applying {} batch to {keyspace}.{table}", batch.kind()))?;
        Ok(())
    }

    async fn execute_schema(&self, cql: &str) -> Result<()> {
        let _ = self.session.query_unpaged(cql, ()).await.into_app_err("applying schema statement")?;
        Ok(())
    }
}

/// The write statement for `table`, with one bind marker per value
fn write_cql(keyspace: &str, table: Table) -> String {
    match table {
        Table::Snapshots => format!(
            "INSERT INTO {keyspace}.snapshots \
             (id, owner_id, repository_id, nwo, created_at, ref, commit_oid, blob_url, source_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        Table::Manifests => format!(
            "INSERT INTO {keyspace}.manifests \
             (id, snapshot_id, owner_id, repository_id, ref, commit_oid, blob_key, manifest_key, \
             package_manager, project_name, project_version, project_license) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        Table::ManifestDependencies => format!(
            "INSERT INTO {keyspace}.manifest_dependencies \
             (manifest_id, package_manager, namespace, name, version, snapshot_id, license, source_url, \
             scope, relationship, runtime, development) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        Table::DependentRepositories => format!(
            "INSERT INTO {keyspace}.dependent_repositories \
             (package_manager, namespace, name, version, owner_id, repository_id, license, source_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        Table::DependentRepositoryCounts => format!(
            "UPDATE {keyspace}.dependent_repository_counts SET used_by = used_by + 1 \
             WHERE package_manager = ? AND namespace = ? AND name = ? AND version = ?"
        ),
    }
}

/// Minimal two's-complement encoding of an unsigned identifier
fn varint(value: u64) -> CqlVarint {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);

    let mut digits = Vec::with_capacity(bytes.len() + 1);
    if bytes[first] & 0x80 != 0 {
        digits.push(0);
    }
    digits.extend_from_slice(&bytes[first..]);

    CqlVarint::from_signed_bytes_be(digits)
}

fn purls(set: &BTreeSet<Purl>) -> Vec<&str> {
    set.iter().map(Purl::as_str).collect()
}
