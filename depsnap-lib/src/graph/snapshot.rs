use super::{EdgeLimits, IdSource, ManifestGenerator, Snapshot, WordSource, generate_package_pool, vocab};
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{EnrichableExt, bail};
use rand::Rng;
use std::sync::Arc;

const LOG_TARGET: &str = "  snapshot";

/// Per-manifest dependency counts for each of the three groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyBudget {
    pub runtime: usize,
    pub development: usize,
    pub transitives: usize,
}

impl DependencyBudget {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.runtime + self.development + self.transitives
    }

    /// Draw a budget for one manifest.
    ///
    /// The total is uniform in `[0, max_dependencies)`. When nonzero, transitives are
    /// uniform in `[0, total)` and the remaining directs are split so that runtime is
    /// uniform in `[0, directs)` and development takes the rest.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, max_dependencies: usize) -> Self {
        if max_dependencies == 0 {
            return Self::default();
        }

        let dependencies = rng.random_range(0..max_dependencies);
        if dependencies == 0 {
            return Self::default();
        }

        let transitives = rng.random_range(0..dependencies);
        let runtime = rng.random_range(0..dependencies - transitives);
        Self::from_draws(dependencies, transitives, runtime)
    }

    /// Build a budget from already drawn values.
    ///
    /// `transitives` must not exceed `dependencies`, and `runtime` must not exceed the
    /// resulting number of directs.
    #[must_use]
    pub const fn from_draws(dependencies: usize, transitives: usize, runtime: usize) -> Self {
        let directs = dependencies - transitives;
        Self {
            runtime,
            development: directs - runtime,
            transitives,
        }
    }
}

/// Knobs that shape generated snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub package_pool_size: usize,
    pub edge_limits: EdgeLimits,
    pub git_ref: String,
    pub blob_host: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            package_pool_size: 10_000,
            edge_limits: EdgeLimits::default(),
            git_ref: "refs/heads/main".to_string(),
            blob_host: "https://foobar.azure.net".to_string(),
        }
    }
}

/// Produces snapshots from a word vocabulary and a randomness source.
///
/// Generation is synchronous and, given a seeded RNG and identifier source, fully
/// deterministic.
#[derive(Debug)]
pub struct SnapshotGenerator<R, I> {
    words: Arc<WordSource>,
    rng: R,
    ids: I,
    settings: GeneratorSettings,
}

impl<R: Rng, I: IdSource> SnapshotGenerator<R, I> {
    #[must_use]
    pub const fn new(words: Arc<WordSource>, rng: R, ids: I, settings: GeneratorSettings) -> Self {
        Self { words, rng, ids, settings }
    }

    /// Generate one snapshot holding `manifest_count` manifests.
    ///
    /// With a `base`, the repository identity (owner, repository, name-with-owner,
    /// source URL and ref) is copied from it; the identifier, commit, timestamp, blob URL
    /// and manifests are always produced anew. A fresh package pool is generated for
    /// every call and shared by all of its manifests.
    pub fn generate(
        &mut self,
        manifest_count: usize,
        max_dependencies: usize,
        base: Option<&Snapshot>,
        created_at: DateTime<Utc>,
    ) -> Result<Snapshot> {
        if max_dependencies > self.settings.package_pool_size {
            bail!(
                "cannot draw up to {max_dependencies} dependencies per manifest from a pool of {} packages",
                self.settings.package_pool_size
            );
        }

        let pool = generate_package_pool(&mut self.rng, &self.words, self.settings.package_pool_size);
        let id = self.ids.next_id().map_err(|e| e.enrich("generating snapshot identifier"))?;

        let mut snapshot = match base {
            Some(base) => Snapshot {
                id,
                owner_id: base.owner_id,
                repository_id: base.repository_id,
                nwo: base.nwo.clone(),
                source_url: base.source_url.clone(),
                git_ref: base.git_ref.clone(),
                commit_oid: vocab::commit_oid(&mut self.rng, &self.words, id),
                created_at,
                blob_url: String::new(),
                manifests: Vec::with_capacity(manifest_count),
            },

            None => {
                let nwo = vocab::nwo(&mut self.rng, &self.words);
                Snapshot {
                    id,
                    owner_id: u64::from(self.rng.random::<u32>()),
                    repository_id: u64::from(self.rng.random::<u32>()),
                    source_url: format!("https://github.com/{nwo}"),
                    nwo,
                    git_ref: self.settings.git_ref.clone(),
                    commit_oid: vocab::commit_oid(&mut self.rng, &self.words, id),
                    created_at,
                    blob_url: String::new(),
                    manifests: Vec::with_capacity(manifest_count),
                }
            }
        };

        snapshot.blob_url = format!(
            "{}/{}/{}/{}",
            self.settings.blob_host.trim_end_matches('/'),
            snapshot.owner_id,
            snapshot.repository_id,
            snapshot.id
        );

        log::info!(
            target: LOG_TARGET,
            "Creating snapshot {} for '{}' (owner={}, repository={}, commit={})",
            snapshot.id,
            snapshot.nwo,
            snapshot.owner_id,
            snapshot.repository_id,
            snapshot.commit_oid
        );

        let manifests = ManifestGenerator::new(&self.words, &pool, self.settings.edge_limits);
        for _ in 0..manifest_count {
            let budget = DependencyBudget::draw(&mut self.rng, max_dependencies);
            let manifest = manifests.generate(&mut self.rng, &mut self.ids, &snapshot, budget)?;
            snapshot.manifests.push(manifest);
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{OsIdSource, SeededIdSource};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::collections::HashSet;

    /// A randomness source that only ever yields zero
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn words() -> Arc<WordSource> {
        Arc::new(WordSource::from_words((0..100).map(|i| format!("token{i}"))).unwrap())
    }

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            package_pool_size: 1_000,
            ..GeneratorSettings::default()
        }
    }

    fn seeded(seed: u64) -> SnapshotGenerator<StdRng, SeededIdSource> {
        SnapshotGenerator::new(words(), StdRng::seed_from_u64(seed), SeededIdSource::new(seed), settings())
    }

    #[test]
    fn zero_randomness_yields_an_empty_manifest() {
        let mut generator = SnapshotGenerator::new(words(), ZeroRng, SeededIdSource::new(0), settings());
        let snapshot = generator.generate(1, 1, None, Utc::now()).unwrap();

        assert_eq!(snapshot.manifests.len(), 1);
        let manifest = &snapshot.manifests[0];
        assert!(manifest.runtime.is_empty());
        assert!(manifest.development.is_empty());
        assert!(manifest.transitives.is_empty());
    }

    #[test]
    fn directs_are_split_between_runtime_and_development() {
        for runtime in 0..6 {
            let budget = DependencyBudget::from_draws(9, 3, runtime);
            assert_eq!(budget.transitives, 3);
            assert_eq!(budget.runtime + budget.development, 6);
            assert_eq!(budget.total(), 9);
        }
    }

    #[test]
    fn drawn_budgets_stay_below_the_maximum() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1_000 {
            let budget = DependencyBudget::draw(&mut rng, 10);
            assert!(budget.total() < 10);
            if budget.total() > 0 {
                assert!(budget.transitives < budget.total());
                assert!(budget.development >= 1);
            }
        }
    }

    #[test]
    fn nine_dependencies_with_three_transitives_leave_six_directs() {
        let mut rng = StdRng::seed_from_u64(9);
        let budget = (0..10_000)
            .map(|_| DependencyBudget::draw(&mut rng, 10))
            .find(|b| b.total() == 9 && b.transitives == 3)
            .expect("a 9/3 split within 10000 draws");

        assert_eq!(budget.runtime + budget.development, 6);
    }

    #[test]
    fn zero_maximum_draws_nothing() {
        assert_eq!(DependencyBudget::draw(&mut StdRng::seed_from_u64(1), 0), DependencyBudget::default());
    }

    #[test]
    fn fresh_snapshot_shape() {
        let mut generator = seeded(3);
        let snapshot = generator.generate(5, 40, None, Utc::now()).unwrap();

        assert_eq!(snapshot.manifests.len(), 5);
        assert_eq!(snapshot.git_ref, "refs/heads/main");
        assert_eq!(snapshot.source_url, format!("https://github.com/{}", snapshot.nwo));
        assert_eq!(
            snapshot.blob_url,
            format!("https://foobar.azure.net/{}/{}/{}", snapshot.owner_id, snapshot.repository_id, snapshot.id)
        );
        assert!(snapshot.owner_id <= u64::from(u32::MAX));

        let manifest_ids: HashSet<_> = snapshot.manifests.iter().map(|m| m.id).collect();
        assert_eq!(manifest_ids.len(), 5);
        assert!(!manifest_ids.contains(&snapshot.id));
        assert!(snapshot.manifests.iter().all(|m| m.dependency_count() < 40));
    }

    #[test]
    fn canonical_snapshot_keeps_repository_identity() {
        let mut generator = seeded(4);
        let base = generator.generate(2, 20, None, Utc::now()).unwrap();
        let derived = generator.generate(3, 20, Some(&base), Utc::now()).unwrap();

        assert_eq!(derived.owner_id, base.owner_id);
        assert_eq!(derived.repository_id, base.repository_id);
        assert_eq!(derived.nwo, base.nwo);
        assert_eq!(derived.source_url, base.source_url);
        assert_eq!(derived.git_ref, base.git_ref);
        assert_ne!(derived.id, base.id);
        assert_ne!(derived.commit_oid, base.commit_oid);
        assert_ne!(derived.blob_url, base.blob_url);
        assert_eq!(derived.manifests.len(), 3);
    }

    #[test]
    fn canonical_commit_differs_with_a_single_word_vocabulary() {
        let words = Arc::new(WordSource::from_words(["only"]).unwrap());
        let mut generator = SnapshotGenerator::new(words, StdRng::seed_from_u64(12), SeededIdSource::new(12), settings());
        let base = generator.generate(0, 0, None, Utc::now()).unwrap();

        for _ in 0..5 {
            let derived = generator.generate(0, 0, Some(&base), Utc::now()).unwrap();
            assert_ne!(derived.id, base.id);
            assert_ne!(derived.commit_oid, base.commit_oid);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let at = DateTime::<Utc>::UNIX_EPOCH;
        let first = seeded(5).generate(3, 30, None, at).unwrap();
        let second = seeded(5).generate(3, 30, None, at).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn os_identifiers_work_with_any_rng() {
        let mut generator = SnapshotGenerator::new(words(), StdRng::seed_from_u64(6), OsIdSource, settings());
        let snapshot = generator.generate(2, 10, None, Utc::now()).unwrap();
        assert_eq!(snapshot.manifests.len(), 2);
    }

    #[test]
    fn oversized_budget_is_rejected() {
        let mut generator = seeded(7);
        let err = generator.generate(1, 1_001, None, Utc::now()).unwrap_err();
        assert!(format!("{err}").contains("1001 dependencies"));
    }

    #[test]
    fn custom_settings_flow_into_metadata() {
        let settings = GeneratorSettings {
            git_ref: "refs/heads/trunk".into(),
            blob_host: "https://blobs.example/".into(),
            ..settings()
        };
        let mut generator = SnapshotGenerator::new(words(), StdRng::seed_from_u64(8), SeededIdSource::new(8), settings);
        let snapshot = generator.generate(0, 10, None, Utc::now()).unwrap();

        assert_eq!(snapshot.git_ref, "refs/heads/trunk");
        assert!(snapshot.blob_url.starts_with("https://blobs.example/"));
        assert_eq!(snapshot.blob_url.matches("//").count(), 1);
        assert!(snapshot.manifests.is_empty());
    }
}
