//! Argument groups and setup shared by the generate and load commands.

use super::ProgressReporter;
use super::config::Config;
use crate::Result;
use crate::graph::{GeneratorSettings, IdSource, OsIdSource, SeededIdSource, Snapshot, SnapshotGenerator, WordSource};
use crate::ingest::{NoProgress, Progress};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use core::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;

const LOG_TARGET: &str = "  commands";

/// Mixed into `--seed` so identifiers do not mirror the generator's own stream
const ID_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if standard error is a terminal
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to configuration file (default is `depsnap.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Options controlling what gets generated
#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Number of snapshots to generate
    #[arg(long, default_value_t = 1, value_name = "COUNT", help_heading = "Generation")]
    pub snapshots: usize,

    /// Number of manifests per snapshot
    #[arg(long, default_value_t = 20, value_name = "COUNT", help_heading = "Generation")]
    pub manifests: usize,

    /// Exclusive upper bound on the dependencies drawn per manifest
    #[arg(long, default_value_t = 200, value_name = "COUNT", help_heading = "Generation")]
    pub max_dependencies: usize,

    /// Derive every snapshot after the first from the same repository
    #[arg(long, help_heading = "Generation")]
    pub canonical: bool,

    /// Seed for reproducible output
    #[arg(long, value_name = "SEED", help_heading = "Generation")]
    pub seed: Option<u64>,

    /// Newline-separated word list used to synthesize names
    #[arg(long, default_value = "/usr/share/dict/words", value_name = "PATH", help_heading = "Generation")]
    pub word_file: Utf8PathBuf,
}

/// Configuration and progress reporting resolved from [`CommonArgs`]
pub struct Common {
    pub config: Config,
    pub progress: Arc<dyn Progress>,
}

impl Common {
    /// Initialize logging and load the configuration
    pub fn new(args: &CommonArgs) -> Result<Self> {
        Self::init_logging(args.log_level);

        let config = Config::load(args.config.as_ref())?;

        // a progress bar would interleave with log lines
        let progress: Arc<dyn Progress> = if args.log_level == LogLevel::None {
            let use_colors = match args.color {
                ColorMode::Always => true,
                ColorMode::Never => false,
                ColorMode::Auto => {
                    use std::io::{IsTerminal, stderr};
                    stderr().is_terminal()
                }
            };

            Arc::new(ProgressReporter::new(Duration::from_millis(300), use_colors))
        } else {
            Arc::new(NoProgress)
        };

        Ok(Self { config, progress })
    }

    /// Initialize logger based on log level
    fn init_logging(log_level: LogLevel) {
        let level = match log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);

        // a second command in the same process keeps the first logger
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
            .try_init();
    }
}

/// Produces the sequence of snapshots requested on the command line.
///
/// In canonical mode the first snapshot fixes the repository identity and every later
/// one is derived from it.
pub struct SnapshotFeed {
    generator: SnapshotGenerator<StdRng, Box<dyn IdSource + Send>>,
    manifests: usize,
    max_dependencies: usize,
    canonical: bool,
    base: Option<Snapshot>,
}

impl SnapshotFeed {
    pub fn new(args: &GenerationArgs, settings: GeneratorSettings) -> Result<Self> {
        let start = Instant::now();
        let words = Arc::new(WordSource::load(&args.word_file)?);
        log::info!(
            target: LOG_TARGET,
            "Loaded {} words from '{}' in {:.3}s",
            words.len(),
            args.word_file,
            start.elapsed().as_secs_f64()
        );

        let (rng, ids): (StdRng, Box<dyn IdSource + Send>) = match args.seed {
            Some(seed) => (StdRng::seed_from_u64(seed), Box::new(SeededIdSource::new(seed ^ ID_SEED_SALT))),
            None => (StdRng::from_os_rng(), Box::new(OsIdSource)),
        };

        Ok(Self {
            generator: SnapshotGenerator::new(words, rng, ids, settings),
            manifests: args.manifests,
            max_dependencies: args.max_dependencies,
            canonical: args.canonical,
            base: None,
        })
    }

    /// Generate the next snapshot in the sequence
    pub fn next_snapshot(&mut self, created_at: DateTime<Utc>) -> Result<Snapshot> {
        let start = Instant::now();
        let snapshot = self
            .generator
            .generate(self.manifests, self.max_dependencies, self.base.as_ref(), created_at)?;

        log::info!(
            target: LOG_TARGET,
            "Generated snapshot {} with {} manifests and {} dependencies in {:.3}s",
            snapshot.id,
            snapshot.manifests.len(),
            snapshot.dependency_count(),
            start.elapsed().as_secs_f64()
        );

        if self.canonical && self.base.is_none() {
            let mut base = snapshot.clone();
            base.manifests.clear();
            self.base = Some(base);
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(dir: &tempfile::TempDir, seed: Option<u64>, canonical: bool) -> GenerationArgs {
        let word_file = Utf8PathBuf::try_from(dir.path().join("words")).unwrap();
        fs::write(&word_file, "apple\nbanana\ncherry\ndate\nelder\nfig\ngrape\n").unwrap();

        GenerationArgs {
            snapshots: 3,
            manifests: 2,
            max_dependencies: 10,
            canonical,
            seed,
            word_file,
        }
    }

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            package_pool_size: 50,
            ..GeneratorSettings::default()
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn seeded_feeds_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, Some(7), false);
        let now = Utc::now();

        let mut first = SnapshotFeed::new(&args, settings()).unwrap();
        let mut second = SnapshotFeed::new(&args, settings()).unwrap();
        for _ in 0..args.snapshots {
            assert_eq!(first.next_snapshot(now).unwrap(), second.next_snapshot(now).unwrap());
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn canonical_feed_keeps_repository_identity() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, Some(11), true);
        let mut feed = SnapshotFeed::new(&args, settings()).unwrap();

        let first = feed.next_snapshot(Utc::now()).unwrap();
        for _ in 1..args.snapshots {
            let next = feed.next_snapshot(Utc::now()).unwrap();
            assert_ne!(next.id, first.id);
            assert_eq!(next.owner_id, first.owner_id);
            assert_eq!(next.repository_id, first.repository_id);
            assert_eq!(next.nwo, first.nwo);
            assert_eq!(next.source_url, first.source_url);
            assert_eq!(next.manifests.len(), 2);
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn missing_word_file_fails() {
        let args = GenerationArgs {
            snapshots: 1,
            manifests: 1,
            max_dependencies: 1,
            canonical: false,
            seed: None,
            word_file: Utf8PathBuf::from("/no/such/words"),
        };

        let _ = SnapshotFeed::new(&args, settings()).err().unwrap();
    }
}
