use super::Store;
use crate::Result;
use ohno::{EnrichableExt, bail};

const LOG_TARGET: &str = "    schema";

/// Longest keyspace name the store accepts
const MAX_KEYSPACE_LEN: usize = 48;

/// Whether `name` can be used unquoted as a keyspace name
#[must_use]
pub fn is_valid_keyspace(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= MAX_KEYSPACE_LEN
}

#[must_use]
pub fn keyspace_ddl(keyspace: &str, replication_factor: u32) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} \
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
    )
}

/// `CREATE TABLE` statements for every table, in creation order
#[must_use]
pub fn table_ddl(keyspace: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.snapshots (
    id uuid,
    owner_id varint,
    repository_id varint,
    nwo text,
    source_url text,
    ref text,
    commit_oid text,
    created_at timestamp,
    blob_url text,
    PRIMARY KEY ((repository_id, ref), created_at)
) WITH CLUSTERING ORDER BY (created_at DESC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.manifests (
    id uuid,
    snapshot_id uuid,
    owner_id varint,
    repository_id varint,
    ref text,
    commit_oid text,
    blob_key text,
    manifest_key text,
    package_manager text,
    project_name text,
    project_version text,
    project_license text,
    PRIMARY KEY ((repository_id, ref), snapshot_id, package_manager, manifest_key)
) WITH CLUSTERING ORDER BY (snapshot_id DESC, package_manager ASC, manifest_key ASC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.manifest_dependencies (
    snapshot_id uuid,
    manifest_id uuid,
    package_manager text,
    namespace text,
    name text,
    version text,
    license text,
    source_url text,
    scope text,
    relationship text,
    runtime set<text>,
    development set<text>,
    PRIMARY KEY ((manifest_id), package_manager, namespace, name, version)
)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.dependent_repositories (
    package_manager text,
    namespace text,
    name text,
    version text,
    owner_id varint,
    repository_id varint,
    license text,
    source_url text,
    PRIMARY KEY ((package_manager, namespace, name), version, repository_id)
) WITH CLUSTERING ORDER BY (version DESC, repository_id ASC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.dependent_repository_counts (
    package_manager text,
    namespace text,
    name text,
    version text,
    used_by counter,
    PRIMARY KEY ((package_manager, namespace, name), version)
) WITH CLUSTERING ORDER BY (version DESC)"
        ),
    ]
}

/// Create the keyspace and all tables if they do not exist yet
pub async fn provision<S: Store>(store: &S, keyspace: &str, replication_factor: u32) -> Result<()> {
    if !is_valid_keyspace(keyspace) {
        bail!("invalid keyspace name '{keyspace}'");
    }

    log::info!(target: LOG_TARGET, "Creating keyspace '{keyspace}'");
    store
        .execute_schema(&keyspace_ddl(keyspace, replication_factor))
        .await
        .map_err(|e| e.enrich_with(|| format!("creating keyspace '{keyspace}'")))?;

    for ddl in table_ddl(keyspace) {
        log::debug!(target: LOG_TARGET, "{ddl}");
        store
            .execute_schema(&ddl)
            .await
            .map_err(|e| e.enrich_with(|| format!("creating tables in keyspace '{keyspace}'")))?;
    }

    Ok(())
}
