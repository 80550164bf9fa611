//! Command-line interface and orchestration for depsnap
//!
//! This module parses arguments, loads configuration, and wires the generator and the
//! ingestion pipeline together.
//!
//! ## Commands
//!
//! - **generate**: Synthesize snapshots and print them as pretty JSON
//! - **load**: Synthesize snapshots and write them into the store, one snapshot at a
//!   time, after provisioning the keyspace and tables. `--dry-run` swaps the cluster
//!   for an in-memory store and prints what would have been written
//! - **init**: Write the default configuration file
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments with clap and routes to the
//! matching handler. The `common` module sets up logging, loads the configuration and
//! builds the snapshot feed shared by `generate` and `load`.

mod common;
mod config;
mod generate;
mod host;
mod init;
mod load;
mod progress_reporter;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use generate::{GenerateArgs, generate_snapshots};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use load::{LoadArgs, load_snapshots};
pub use progress_reporter::ProgressReporter;
pub use run::run;
