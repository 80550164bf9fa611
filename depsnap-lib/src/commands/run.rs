//! Command dispatch logic for depsnap

use super::{GenerateArgs, InitArgs, LoadArgs, generate_snapshots, init_config, load_snapshots};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "depsnap", version, author, long_about = None)]
#[command(about = "Synthesize repository dependency snapshots and load them into a wide-column store")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: DepsnapSubcommand,
}

#[derive(Subcommand, Debug)]
enum DepsnapSubcommand {
    /// Generate snapshots and print them as JSON
    Generate(Box<GenerateArgs>),
    /// Generate snapshots and write them into the store
    Load(Box<LoadArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// Usage errors, `--help` and `--version` are written to the host, which is then asked
/// to exit with clap's status code.
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            if e.use_stderr() {
                let _ = write!(host.error(), "{e}");
            } else {
                let _ = write!(host.output(), "{e}");
            }

            host.exit(e.exit_code());
            return Ok(());
        }
    };

    match &cli.command {
        DepsnapSubcommand::Generate(generate_args) => generate_snapshots(host, generate_args),
        DepsnapSubcommand::Load(load_args) => load_snapshots(host, load_args).await,
        DepsnapSubcommand::Init(init_args) => init_config(host, init_args),
    }
}
