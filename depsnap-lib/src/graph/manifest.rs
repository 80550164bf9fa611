use super::{DependencyBudget, EdgeLimits, IdSource, Manifest, Package, Snapshot, WordSource, select_dependencies, vocab};
use crate::Result;
use ohno::EnrichableExt;
use rand::Rng;

const LOG_TARGET: &str = "  manifest";

/// Assembles one manifest's metadata and dependency groups.
///
/// Borrows the snapshot-wide package pool so every manifest of a generation call
/// draws from the same candidates.
#[derive(Debug, Clone, Copy)]
pub struct ManifestGenerator<'a> {
    words: &'a WordSource,
    pool: &'a [Package],
    limits: EdgeLimits,
}

impl<'a> ManifestGenerator<'a> {
    #[must_use]
    pub const fn new(words: &'a WordSource, pool: &'a [Package], limits: EdgeLimits) -> Self {
        Self { words, pool, limits }
    }

    /// Generate one manifest belonging to `snapshot`.
    ///
    /// Fails only when a manifest identifier cannot be produced.
    pub fn generate<R, I>(&self, rng: &mut R, ids: &mut I, snapshot: &Snapshot, budget: DependencyBudget) -> Result<Manifest>
    where
        R: Rng + ?Sized,
        I: IdSource + ?Sized,
    {
        let package_manager = vocab::package_manager(rng);
        let id = ids
            .next_id()
            .map_err(|e| e.enrich_with(|| format!("generating manifest identifier for snapshot {}", snapshot.id)))?;

        log::debug!(
            target: LOG_TARGET,
            "Creating manifest {id} ({package_manager}) with dependencies: runtime={}, development={}, transitive={}",
            budget.runtime,
            budget.development,
            budget.transitives
        );

        let file_path = vocab::file_path(rng, self.words, package_manager);
        let project_name = self.words.pick(rng).to_string();
        let project_version = vocab::semver(rng);
        let project_license = vocab::license(rng);
        let selected = select_dependencies(rng, self.pool, package_manager, budget, self.limits);

        Ok(Manifest {
            id,
            package_manager,
            file_path,
            blob_key: format!("{}/{}/{id}", snapshot.repository_id, snapshot.id),
            project_name,
            project_version,
            project_license,
            runtime: selected.runtime,
            development: selected.development,
            transitives: selected.transitives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{SeededIdSource, generate_package_pool};
    use chrono::{DateTime, Utc};
    use ohno::app_err;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    struct FailingIds;

    impl IdSource for FailingIds {
        fn next_id(&mut self) -> Result<Uuid> {
            Err(app_err!("entropy exhausted"))
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            id: Uuid::from_u128(7),
            owner_id: 10,
            repository_id: 20,
            nwo: "o/r".into(),
            source_url: "https://github.com/o/r".into(),
            git_ref: "refs/heads/main".into(),
            commit_oid: "oid".into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            blob_url: String::new(),
            manifests: Vec::new(),
        }
    }

    #[test]
    fn manifest_metadata_is_derived_from_identifiers() {
        let words = WordSource::from_words((0..50).map(|i| format!("word{i}"))).unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        let pool = generate_package_pool(&mut rng, &words, 500);
        let generator = ManifestGenerator::new(&words, &pool, EdgeLimits::default());
        let budget = DependencyBudget {
            runtime: 2,
            development: 3,
            transitives: 4,
        };

        let manifest = generator.generate(&mut rng, &mut SeededIdSource::new(1), &snapshot(), budget).unwrap();

        assert_eq!(manifest.blob_key, format!("20/{}/{}", Uuid::from_u128(7), manifest.id));
        assert!(manifest.file_path.ends_with(manifest.package_manager.filename()));
        assert_eq!(manifest.dependency_count(), 9);
        assert_eq!(manifest.runtime.len(), 2);
        assert_eq!(manifest.development.len(), 3);
        assert_eq!(manifest.transitives.len(), 4);
    }

    #[test]
    fn identifier_failure_propagates() {
        let words = WordSource::from_words(["a", "b"]).unwrap();
        let generator = ManifestGenerator::new(&words, &[], EdgeLimits::default());

        let err = generator
            .generate(&mut StdRng::seed_from_u64(1), &mut FailingIds, &snapshot(), DependencyBudget::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("entropy exhausted"));
    }
}
