use super::{Package, WordSource, vocab};
use rand::Rng;

/// Generate `size` independent candidate packages.
///
/// Entries are not deduplicated; identical coordinates collapse naturally during
/// selection because the selector keys its working set by PURL.
pub fn generate_package_pool<R: Rng + ?Sized>(rng: &mut R, words: &WordSource, size: usize) -> Vec<Package> {
    (0..size)
        .map(|_| Package {
            namespace: words.pick(rng).to_string(),
            name: words.pick(rng).to_string(),
            version: vocab::semver(rng),
            source_url: vocab::github_url(rng, words),
            license: vocab::license(rng),
        })
        .collect()
}
