use super::{Dependency, DependencyBudget, Package, PackageManager, Purl, Relationship, Scope, vocab};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::{BTreeSet, HashSet};

/// Exclusive upper bounds on the number of "requires" edges drawn per dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLimits {
    pub max_runtime: usize,
    pub max_development: usize,
}

impl Default for EdgeLimits {
    fn default() -> Self {
        Self {
            max_runtime: 20,
            max_development: 10,
        }
    }
}

/// The three pairwise-disjoint dependency groups of one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedDependencies {
    pub runtime: Vec<Dependency>,
    pub development: Vec<Dependency>,
    pub transitives: Vec<Dependency>,
}

/// Pick a manifest's dependencies from the shared pool.
///
/// A working set of `budget.total()` PURL-distinct packages is drawn first, resampling
/// on collision. The set is shuffled, then runtime and development entries are popped
/// off its end without replacement; whatever remains becomes transitives with a random
/// scope. Every selected entry gets runtime and development edges sampled with
/// replacement from the whole working set, so edges may point at the entry itself.
///
/// The pool must hold at least `budget.total()` distinct PURLs, otherwise the
/// working-set draw never completes. An empty pool with a nonzero budget panics.
pub fn select_dependencies<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[Package],
    manager: PackageManager,
    budget: DependencyBudget,
    limits: EdgeLimits,
) -> SelectedDependencies {
    let total = budget.total();
    let mut seen = HashSet::with_capacity(total);
    let mut working: Vec<Package> = Vec::with_capacity(total);

    while working.len() < total {
        let candidate = &pool[rng.random_range(0..pool.len())];
        if seen.insert(candidate.purl(manager)) {
            working.push(candidate.clone());
        }
    }

    let universe: Vec<Purl> = working.iter().map(|p| p.purl(manager)).collect();
    working.shuffle(rng);

    let runtime = working.split_off(working.len() - budget.runtime);
    let development = working.split_off(working.len() - budget.development);
    let transitives = working;

    SelectedDependencies {
        runtime: runtime
            .into_iter()
            .map(|p| attach(rng, p, Scope::Runtime, Relationship::Direct, &universe, limits))
            .collect(),
        development: development
            .into_iter()
            .map(|p| attach(rng, p, Scope::Development, Relationship::Direct, &universe, limits))
            .collect(),
        transitives: transitives
            .into_iter()
            .map(|p| {
                let scope = vocab::scope(rng);
                attach(rng, p, scope, Relationship::Indirect, &universe, limits)
            })
            .collect(),
    }
}

fn attach<R: Rng + ?Sized>(
    rng: &mut R,
    package: Package,
    scope: Scope,
    relationship: Relationship,
    universe: &[Purl],
    limits: EdgeLimits,
) -> Dependency {
    let runtime = sample_edges(rng, universe, limits.max_runtime);
    let development = sample_edges(rng, universe, limits.max_development);
    package.resolve(scope, relationship, runtime, development)
}

fn sample_edges<R: Rng + ?Sized>(rng: &mut R, universe: &[Purl], max: usize) -> BTreeSet<Purl> {
    if max == 0 {
        return BTreeSet::new();
    }

    let count = rng.random_range(0..max);
    (0..count).filter_map(|_| universe.choose(rng).cloned()).collect()
}
