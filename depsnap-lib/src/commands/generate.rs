use super::Host;
use super::common::{Common, CommonArgs, GenerationArgs, SnapshotFeed};
use crate::Result;
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Write the snapshots to a file instead of standard output
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

/// Generate snapshots and emit them as a pretty-printed JSON array
pub fn generate_snapshots<H: Host>(host: &mut H, args: &GenerateArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let mut feed = SnapshotFeed::new(&args.generation, common.config.generator.settings())?;

    common.progress.set_phase("Generating");
    common.progress.set_total(args.generation.snapshots as u64);

    let mut snapshots = Vec::with_capacity(args.generation.snapshots);
    for _ in 0..args.generation.snapshots {
        snapshots.push(feed.next_snapshot(Utc::now())?);
        common.progress.advance(1);
    }

    common.progress.done();

    let json = serde_json::to_string_pretty(&snapshots).into_app_err("serializing snapshots")?;
    if let Some(path) = &args.output {
        fs::write(path, json).into_app_err_with(|| format!("writing snapshots to '{path}'"))?;
        let _ = writeln!(host.error(), "Wrote {} snapshot(s) to {path}", snapshots.len());
    } else {
        let _ = writeln!(host.output(), "{json}");
    }

    Ok(())
}
