//! Generation and ingestion exercised together against in-memory stores.

use chrono::Utc;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;
use depsnap_lib::Result;
use depsnap_lib::graph::{
    DependencyBudget, GeneratorSettings, ManifestGenerator, PackageManager, Purl, SeededIdSource, Snapshot, SnapshotGenerator, WordSource,
    generate_package_pool,
};
use depsnap_lib::ingest::{
    DependencyCountRow, IngestSettings, Ingestor, ManifestRow, MemoryStore, SnapshotRow, Statement, Store, Table, WriteBatch, fan_out,
};
use ohno::bail;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

fn words() -> Arc<WordSource> {
    Arc::new(WordSource::from_words((0..200).map(|i| format!("word{i}"))).unwrap())
}

fn generator(seed: u64) -> SnapshotGenerator<StdRng, SeededIdSource> {
    let settings = GeneratorSettings {
        package_pool_size: 1_000,
        ..GeneratorSettings::default()
    };
    SnapshotGenerator::new(words(), StdRng::seed_from_u64(seed), SeededIdSource::new(seed), settings)
}

fn purls(manager: PackageManager, deps: &[depsnap_lib::graph::Dependency]) -> BTreeSet<Purl> {
    deps.iter().map(|d| d.purl(manager)).collect()
}

#[test]
fn groups_are_disjoint_across_seeds() {
    for seed in 0..20 {
        let snapshot = generator(seed).generate(8, 80, None, Utc::now()).unwrap();

        for manifest in &snapshot.manifests {
            let manager = manifest.package_manager;
            let runtime = purls(manager, &manifest.runtime);
            let development = purls(manager, &manifest.development);
            let transitives = purls(manager, &manifest.transitives);

            assert_eq!(runtime.len(), manifest.runtime.len(), "seed {seed}");
            assert_eq!(development.len(), manifest.development.len(), "seed {seed}");
            assert_eq!(transitives.len(), manifest.transitives.len(), "seed {seed}");
            assert!(runtime.is_disjoint(&development), "seed {seed}");
            assert!(runtime.is_disjoint(&transitives), "seed {seed}");
            assert!(development.is_disjoint(&transitives), "seed {seed}");
            assert!(manifest.dependency_count() < 80, "seed {seed}");
        }
    }
}

#[test]
fn group_sizes_match_the_budget() {
    let words = words();
    let mut rng = StdRng::seed_from_u64(3);
    let pool = generate_package_pool(&mut rng, &words, 500);
    let generator = ManifestGenerator::new(&words, &pool, GeneratorSettings::default().edge_limits);
    let owner = generator_snapshot();

    let mut ids = SeededIdSource::new(3);
    for (deps, transitives, runtime) in [(0, 0, 0), (9, 3, 2), (40, 10, 30), (25, 0, 0)] {
        let budget = DependencyBudget::from_draws(deps, transitives, runtime);
        let manifest = generator.generate(&mut rng, &mut ids, &owner, budget).unwrap();

        assert_eq!(manifest.dependency_count(), deps);
        assert_eq!(manifest.transitives.len(), transitives);
        assert_eq!(manifest.runtime.len() + manifest.development.len(), deps - transitives);
    }
}

fn generator_snapshot() -> Snapshot {
    generator(100).generate(0, 0, None, Utc::now()).unwrap()
}

#[test]
fn canonical_derivation_across_seeds() {
    for seed in 0..10 {
        let mut generator = generator(seed);
        let base = generator.generate(1, 10, None, Utc::now()).unwrap();

        for _ in 0..3 {
            let derived = generator.generate(2, 10, Some(&base), Utc::now()).unwrap();
            assert_eq!(derived.owner_id, base.owner_id);
            assert_eq!(derived.repository_id, base.repository_id);
            assert_eq!(derived.nwo, base.nwo);
            assert_eq!(derived.source_url, base.source_url);
            assert_ne!(derived.id, base.id);
            assert_ne!(derived.commit_oid, base.commit_oid);
        }
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn ingestion_writes_match_the_snapshot() {
    for seed in [1, 2, 3] {
        let snapshot = generator(seed).generate(10, 50, None, Utc::now()).unwrap();
        let manifests = snapshot.manifests.len();
        let dependencies = snapshot.dependency_count();

        let mut expected_usage: HashMap<DependencyCountRow, u64> = HashMap::new();
        for manifest in &snapshot.manifests {
            for dep in manifest.dependencies() {
                let (_, _, count) = fan_out(&snapshot, manifest, dep);
                *expected_usage.entry(count).or_default() += 1;
            }
        }

        let store = Arc::new(MemoryStore::new());
        let settings = IngestSettings {
            max_concurrency: 4,
            batch_size: 7,
        };
        let summary = Ingestor::new(Arc::clone(&store), "ks", settings).ingest(snapshot).await.unwrap();

        assert_eq!(summary.manifests, manifests);
        assert_eq!(summary.dependencies(), dependencies);
        assert_eq!(store.rows_written(Table::Snapshots), 1);
        assert_eq!(store.rows_written(Table::Manifests), manifests);
        assert_eq!(store.rows_written(Table::ManifestDependencies), dependencies);
        assert_eq!(store.rows_written(Table::DependentRepositories), dependencies);
        assert_eq!(store.rows_written(Table::DependentRepositoryCounts), dependencies);

        for (key, uses) in &expected_usage {
            assert_eq!(store.used_by(key), *uses);
        }
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn rows_follow_dependency_order_within_a_manifest() {
    let snapshot = generator(21).generate(4, 40, None, Utc::now()).unwrap();

    let store = Arc::new(MemoryStore::new());
    let settings = IngestSettings {
        max_concurrency: 2,
        batch_size: 3,
    };
    let _ = Ingestor::new(Arc::clone(&store), "ks", settings).ingest(snapshot.clone()).await.unwrap();

    assert_eq!(store.snapshots(), [SnapshotRow::from(&snapshot)]);

    let manifests = store.manifests();
    assert_eq!(manifests.len(), snapshot.manifests.len());
    for manifest in &snapshot.manifests {
        assert!(manifests.contains(&ManifestRow::new(&snapshot, manifest)));
    }

    let facts = store.manifest_dependencies();
    for manifest in &snapshot.manifests {
        let expected: Vec<_> = manifest.dependencies().map(|d| fan_out(&snapshot, manifest, d).0).collect();
        let written: Vec<_> = facts.iter().filter(|row| row.manifest_id == manifest.id).cloned().collect();
        assert_eq!(written, expected);
    }

    let dependents = store.dependent_repositories();
    assert_eq!(dependents.len(), snapshot.dependency_count());
    for row in &dependents {
        assert_eq!(row.owner_id, snapshot.owner_id);
        assert_eq!(row.repository_id, snapshot.repository_id);
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn single_manifest_rows_keep_their_push_order() {
    let snapshot = generator(22).generate(1, 60, None, Utc::now()).unwrap();
    let manifest = &snapshot.manifests[0];

    let store = Arc::new(MemoryStore::new());
    let settings = IngestSettings {
        max_concurrency: 1,
        batch_size: 3,
    };
    let _ = Ingestor::new(Arc::clone(&store), "ks", settings).ingest(snapshot.clone()).await.unwrap();

    let (facts, dependents): (Vec<_>, Vec<_>) = manifest
        .dependencies()
        .map(|d| {
            let (fact, dependent, _) = fan_out(&snapshot, manifest, d);
            (fact, dependent)
        })
        .unzip();

    assert_eq!(store.manifest_dependencies(), facts);
    assert_eq!(store.dependent_repositories(), dependents);
    assert_eq!(store.batches_executed(Table::ManifestDependencies), facts.len().div_ceil(3));
}

/// Delays every write and fails the manifest insert with the chosen ordinal
struct FailNthManifest {
    inner: MemoryStore,
    fail_at: usize,
    manifest_writes: AtomicUsize,
    failures: AtomicUsize,
}

impl FailNthManifest {
    fn new(fail_at: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_at,
            manifest_writes: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }
}

impl Store for FailNthManifest {
    async fn execute(&self, keyspace: &str, statement: Statement) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(2)).await;

        if statement.table() == Table::Manifests && self.manifest_writes.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            let _ = self.failures.fetch_add(1, Ordering::SeqCst);
            bail!("injected manifest failure");
        }

        self.inner.execute(keyspace, statement).await
    }

    async fn execute_batch(&self, keyspace: &str, batch: WriteBatch) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.inner.execute_batch(keyspace, batch).await
    }

    async fn execute_schema(&self, cql: &str) -> Result<()> {
        self.inner.execute_schema(cql).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn single_failure_is_reported_once_and_tickets_are_released() {
    for fail_at in [0, 3, 7] {
        let snapshot = generator(fail_at as u64).generate(12, 30, None, Utc::now()).unwrap();
        let manifests = snapshot.manifests.len();

        let store = Arc::new(FailNthManifest::new(fail_at));
        let settings = IngestSettings {
            max_concurrency: 4,
            batch_size: 5,
        };
        let ingestor = Ingestor::new(Arc::clone(&store), "ks", settings);

        let err = ingestor.ingest(snapshot).await.unwrap_err();
        assert!(format!("{err}").contains("injected manifest failure"));
        assert_eq!(store.failures.load(Ordering::SeqCst), 1);

        assert_eq!(ingestor.tickets().available(), ingestor.tickets().capacity());
        assert!(store.inner.rows_written(Table::Manifests) < manifests);
        assert_eq!(store.inner.rows_written(Table::Snapshots), 1);
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn repeated_ingestion_double_counts_usage() {
    let snapshot = generator(8).generate(3, 20, None, Utc::now()).unwrap();
    let Some((manifest, dep)) = snapshot.manifests.iter().find_map(|m| m.dependencies().next().map(|d| (m, d))) else {
        return;
    };
    let (_, _, key) = fan_out(&snapshot, manifest, dep);

    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(Arc::clone(&store), "ks", IngestSettings::default());
    let _ = ingestor.ingest(snapshot.clone()).await.unwrap();
    let once = store.used_by(&key);
    let _ = ingestor.ingest(snapshot).await.unwrap();

    assert_eq!(store.used_by(&key), once * 2);
}
