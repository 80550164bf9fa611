//! Fixed vocabularies and distributions for synthesized metadata.

use super::{PackageManager, Scope, WordSource};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use rand::Rng;
use rand::seq::IndexedRandom;
use semver::Version;
use sha2::{Digest, Sha256};
use strum::VariantArray;
use uuid::Uuid;

const LICENSES: &[&str] = &["Apache-2.0", "MIT", "GPL-1.0-only", "APL-1.0-only", "MS-PL", "NASA-1.3", "OSL-1.0", "SPL-1.0"];

const MAX_MAJOR: u64 = 10;
const MAX_MINOR: u64 = 50;
const MAX_PATCH: u64 = 100;

const PATH_SEGMENTS: usize = 3;

pub fn license<R: Rng + ?Sized>(rng: &mut R) -> String {
    LICENSES.choose(rng).copied().unwrap_or("MIT").to_string()
}

pub fn scope<R: Rng + ?Sized>(rng: &mut R) -> Scope {
    if rng.random_bool(0.5) { Scope::Runtime } else { Scope::Development }
}

pub fn package_manager<R: Rng + ?Sized>(rng: &mut R) -> PackageManager {
    PackageManager::VARIANTS.choose(rng).copied().unwrap_or(PackageManager::Npm)
}

pub fn semver<R: Rng + ?Sized>(rng: &mut R) -> String {
    Version::new(rng.random_range(0..MAX_MAJOR), rng.random_range(0..MAX_MINOR), rng.random_range(0..MAX_PATCH)).to_string()
}

pub fn github_url<R: Rng + ?Sized>(rng: &mut R, words: &WordSource) -> String {
    format!("https://github.com/{}/{}", words.pick(rng), words.pick(rng))
}

/// A repository "name with owner", such as `owner/name`
pub fn nwo<R: Rng + ?Sized>(rng: &mut R, words: &WordSource) -> String {
    format!("{}/{}", words.pick(rng), words.pick(rng))
}

/// A commit identifier derived as a content hash over the owning snapshot's id and two
/// random words, so distinct snapshots never share a commit
pub fn commit_oid<R: Rng + ?Sized>(rng: &mut R, words: &WordSource, snapshot_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot_id.as_bytes());
    hasher.update(words.pick(rng).as_bytes());
    hasher.update(words.pick(rng).as_bytes());
    URL_SAFE.encode(hasher.finalize())
}

/// Three random directories followed by the manager's canonical filename
pub fn file_path<R: Rng + ?Sized>(rng: &mut R, words: &WordSource, manager: PackageManager) -> String {
    let mut segments: Vec<&str> = (0..PATH_SEGMENTS).map(|_| words.pick(rng)).collect();
    segments.push(manager.filename());
    segments.join("/")
}
