//! Synthetic dependency-graph generation
//!
//! This module produces in-memory [`Snapshot`] values describing a repository's
//! dependency state: a snapshot holds manifests, and each manifest lists runtime,
//! development, and transitive dependencies.
//!
//! # Implementation Model
//!
//! Generation runs leaf-to-root:
//! - **Words**: an immutable [`WordSource`] supplies tokens for names, paths and identifiers
//! - **Pool**: a fixed-size pool of candidate packages is shared by every manifest of one
//!   generation call, so the same coordinates show up across manifests
//! - **Selection**: each manifest draws a PURL-distinct working set from the pool, shuffles
//!   it, and pops entries without replacement into its dependency groups
//! - **Manifests and snapshots**: metadata is synthesized around the selected dependencies
//!
//! All randomness flows through one caller-supplied RNG plus an [`IdSource`] for 128-bit
//! identifiers, so a seeded run is fully reproducible.

mod ids;
mod manifest;
mod model;
mod pool;
mod purl;
mod selector;
mod snapshot;
mod vocab;
mod words;

pub use ids::{IdSource, OsIdSource, SeededIdSource};
pub use manifest::ManifestGenerator;
pub use model::{Dependency, Manifest, Package, PackageManager, Relationship, Scope, Snapshot};
pub use pool::generate_package_pool;
pub use purl::Purl;
pub use selector::{EdgeLimits, SelectedDependencies, select_dependencies};
pub use snapshot::{DependencyBudget, GeneratorSettings, SnapshotGenerator};
pub use words::WordSource;
