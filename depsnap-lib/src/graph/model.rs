use super::Purl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumString, IntoStaticStr, VariantArray};
use uuid::Uuid;

/// The package ecosystems a manifest can belong to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Display, EnumString, IntoStaticStr, VariantArray,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pip,
    Cargo,
    Pub,
    Maven,
    Gem,
}

impl PackageManager {
    /// The canonical manifest filename for this ecosystem
    #[must_use]
    pub const fn filename(self) -> &'static str {
        match self {
            Self::Npm => "package.json",
            Self::Pip => "requirements.txt",
            Self::Cargo => "Cargo.toml",
            Self::Pub => "pubspec.json",
            Self::Maven => "POM.xml",
            Self::Gem => "Gemfile",
        }
    }

    /// Whether namespaces use `@scope` notation in package identifiers
    #[must_use]
    pub const fn is_scoped(self) -> bool {
        matches!(self, Self::Npm)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString, IntoStaticStr, VariantArray)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    Runtime,
    Development,
}

impl Scope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Relationship {
    /// Declared explicitly by the manifest
    Direct,

    /// Present in the graph without being declared by the manifest
    Indirect,
}

impl Relationship {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A candidate package from the shared pool, not yet attached to any manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Package {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub license: String,
}

impl Package {
    /// The identifier of this package within the given ecosystem
    #[must_use]
    pub fn purl(&self, manager: PackageManager) -> Purl {
        Purl::encode(manager, &self.namespace, &self.name, &self.version)
    }

    /// Attach this package to a manifest.
    ///
    /// Scope, relationship and edges are fixed here and never change afterwards.
    #[must_use]
    pub fn resolve(self, scope: Scope, relationship: Relationship, runtime: BTreeSet<Purl>, development: BTreeSet<Purl>) -> Dependency {
        Dependency {
            namespace: self.namespace,
            name: self.name,
            version: self.version,
            source_url: self.source_url,
            license: self.license,
            scope,
            relationship,
            runtime,
            development,
        }
    }
}

/// One resolved package in a manifest's dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dependency {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub license: String,
    pub scope: Scope,
    pub relationship: Relationship,

    /// Packages this one requires at runtime (shallow, unresolved)
    pub runtime: BTreeSet<Purl>,

    /// Packages this one requires for development (shallow, unresolved)
    pub development: BTreeSet<Purl>,
}

impl Dependency {
    #[must_use]
    pub fn purl(&self, manager: PackageManager) -> Purl {
        Purl::encode(manager, &self.namespace, &self.name, &self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
    pub id: Uuid,
    pub package_manager: PackageManager,
    pub file_path: String,
    pub blob_key: String,
    pub project_name: String,
    pub project_version: String,
    pub project_license: String,
    pub runtime: Vec<Dependency>,
    pub development: Vec<Dependency>,
    pub transitives: Vec<Dependency>,
}

impl Manifest {
    #[must_use]
    pub const fn dependency_count(&self) -> usize {
        self.runtime.len() + self.development.len() + self.transitives.len()
    }

    /// All dependencies in write order: runtime, then development, then transitives
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.runtime.iter().chain(&self.development).chain(&self.transitives)
    }
}

/// One point-in-time capture of a repository's dependency manifests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub owner_id: u64,
    pub repository_id: u64,
    pub nwo: String,
    pub source_url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commit_oid: String,
    pub created_at: DateTime<Utc>,
    pub blob_url: String,
    pub manifests: Vec<Manifest>,
}

impl Snapshot {
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.manifests.iter().map(Manifest::dependency_count).sum()
    }
}
