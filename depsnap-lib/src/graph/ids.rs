use crate::Result;
use ohno::IntoAppError;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng, TryRngCore};
use uuid::{Builder, Uuid};

/// Supplies the 128-bit identifiers of snapshots and manifests.
///
/// A failure here is fatal to the snapshot being generated.
pub trait IdSource {
    fn next_id(&mut self) -> Result<Uuid>;
}

impl<T: IdSource + ?Sized> IdSource for Box<T> {
    fn next_id(&mut self) -> Result<Uuid> {
        (**self).next_id()
    }
}

/// Draws identifiers from the operating system's random number generator
#[derive(Debug, Clone, Copy, Default)]
pub struct OsIdSource;

impl IdSource for OsIdSource {
    fn next_id(&mut self) -> Result<Uuid> {
        let mut bytes = [0u8; 16];
        OsRng.try_fill_bytes(&mut bytes).into_app_err("drawing identifier bytes from the OS")?;
        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}

/// Draws identifiers from a seeded generator, for reproducible runs
#[derive(Debug, Clone)]
pub struct SeededIdSource {
    rng: StdRng,
}

impl SeededIdSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IdSource for SeededIdSource {
    fn next_id(&mut self) -> Result<Uuid> {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}
