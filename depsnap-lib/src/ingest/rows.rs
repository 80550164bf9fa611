use crate::graph::{Dependency, Manifest, PackageManager, Purl, Relationship, Scope, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A row of the `snapshots` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub id: Uuid,
    pub owner_id: u64,
    pub repository_id: u64,
    pub nwo: String,
    pub source_url: String,
    pub git_ref: String,
    pub commit_oid: String,
    pub created_at: DateTime<Utc>,
    pub blob_url: String,
}

impl From<&Snapshot> for SnapshotRow {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            repository_id: snapshot.repository_id,
            nwo: snapshot.nwo.clone(),
            source_url: snapshot.source_url.clone(),
            git_ref: snapshot.git_ref.clone(),
            commit_oid: snapshot.commit_oid.clone(),
            created_at: snapshot.created_at,
            blob_url: snapshot.blob_url.clone(),
        }
    }
}

/// A row of the `manifests` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub id: Uuid,
    pub snapshot_id: Uuid,
    pub owner_id: u64,
    pub repository_id: u64,
    pub git_ref: String,
    pub commit_oid: String,
    pub blob_key: String,

    /// The manifest's file path within the repository
    pub manifest_key: String,

    pub package_manager: PackageManager,
    pub project_name: String,
    pub project_version: String,
    pub project_license: String,
}

impl ManifestRow {
    #[must_use]
    pub fn new(snapshot: &Snapshot, manifest: &Manifest) -> Self {
        Self {
            id: manifest.id,
            snapshot_id: snapshot.id,
            owner_id: snapshot.owner_id,
            repository_id: snapshot.repository_id,
            git_ref: snapshot.git_ref.clone(),
            commit_oid: snapshot.commit_oid.clone(),
            blob_key: manifest.blob_key.clone(),
            manifest_key: manifest.file_path.clone(),
            package_manager: manifest.package_manager,
            project_name: manifest.project_name.clone(),
            project_version: manifest.project_version.clone(),
            project_license: manifest.project_license.clone(),
        }
    }
}

/// A row of the `manifest_dependencies` fact table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependencyRow {
    pub manifest_id: Uuid,
    pub snapshot_id: Uuid,
    pub package_manager: PackageManager,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub license: String,
    pub source_url: String,
    pub scope: Scope,
    pub relationship: Relationship,
    pub runtime: BTreeSet<Purl>,
    pub development: BTreeSet<Purl>,
}

/// A row of the `dependent_repositories` reverse index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentRepositoryRow {
    pub package_manager: PackageManager,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub owner_id: u64,
    pub repository_id: u64,
    pub license: String,
    pub source_url: String,
}

/// A `+1` increment of the `used_by` counter in `dependent_repository_counts`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyCountRow {
    pub package_manager: PackageManager,
    pub namespace: String,
    pub name: String,
    pub version: String,
}

/// Derive the three denormalized writes for one dependency of `manifest`
#[must_use]
pub fn fan_out(
    snapshot: &Snapshot,
    manifest: &Manifest,
    dependency: &Dependency,
) -> (ManifestDependencyRow, DependentRepositoryRow, DependencyCountRow) {
    let fact = ManifestDependencyRow {
        manifest_id: manifest.id,
        snapshot_id: snapshot.id,
        package_manager: manifest.package_manager,
        namespace: dependency.namespace.clone(),
        name: dependency.name.clone(),
        version: dependency.version.clone(),
        license: dependency.license.clone(),
        source_url: dependency.source_url.clone(),
        scope: dependency.scope,
        relationship: dependency.relationship,
        runtime: dependency.runtime.clone(),
        development: dependency.development.clone(),
    };

    let dependent = DependentRepositoryRow {
        package_manager: manifest.package_manager,
        namespace: dependency.namespace.clone(),
        name: dependency.name.clone(),
        version: dependency.version.clone(),
        owner_id: snapshot.owner_id,
        repository_id: snapshot.repository_id,
        license: dependency.license.clone(),
        source_url: dependency.source_url.clone(),
    };

    let count = DependencyCountRow {
        package_manager: manifest.package_manager,
        namespace: dependency.namespace.clone(),
        name: dependency.name.clone(),
        version: dependency.version.clone(),
    };

    (fact, dependent, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Package;

    #[test]
    fn fan_out_keys_each_table_correctly() {
        let dependency = Package {
            namespace: "acme".into(),
            name: "rocket".into(),
            version: "2.0.1".into(),
            source_url: "https://github.com/acme/rocket".into(),
            license: "MIT".into(),
        }
        .resolve(Scope::Development, Relationship::Indirect, BTreeSet::new(), BTreeSet::new());

        let manifest = Manifest {
            id: Uuid::from_u128(2),
            package_manager: PackageManager::Npm,
            file_path: "a/b/c/package.json".into(),
            blob_key: "9/1/2".into(),
            project_name: "proj".into(),
            project_version: "1.0.0".into(),
            project_license: "MIT".into(),
            runtime: Vec::new(),
            development: Vec::new(),
            transitives: vec![dependency.clone()],
        };

        let snapshot = Snapshot {
            id: Uuid::from_u128(1),
            owner_id: 8,
            repository_id: 9,
            nwo: "o/r".into(),
            source_url: "https://github.com/o/r".into(),
            git_ref: "refs/heads/main".into(),
            commit_oid: "abc".into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            blob_url: "https://host/8/9/1".into(),
            manifests: vec![manifest.clone()],
        };

        let (fact, dependent, count) = fan_out(&snapshot, &manifest, &dependency);

        assert_eq!(fact.manifest_id, manifest.id);
        assert_eq!(fact.snapshot_id, snapshot.id);
        assert_eq!(fact.scope, Scope::Development);
        assert_eq!(fact.relationship, Relationship::Indirect);
        assert_eq!(dependent.repository_id, 9);
        assert_eq!(dependent.owner_id, 8);
        assert_eq!(count.package_manager, PackageManager::Npm);
        assert_eq!(count.name, "rocket");

        let row = ManifestRow::new(&snapshot, &manifest);
        assert_eq!(row.manifest_key, "a/b/c/package.json");
        assert_eq!(row.snapshot_id, snapshot.id);
        assert_eq!(SnapshotRow::from(&snapshot).git_ref, "refs/heads/main");
    }
}
