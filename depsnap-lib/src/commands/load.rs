use super::Host;
use super::common::{Common, CommonArgs, GenerationArgs, SnapshotFeed};
use crate::Result;
use crate::ingest::{IngestSummary, Ingestor, MemoryStore, ScyllaStore, Store, Table, provision};
use chrono::Utc;
use clap::Parser;
use ohno::EnrichableExt;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use strum::VariantArray;

const LOG_TARGET: &str = "      load";

#[derive(Parser, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Ingest into an in-memory store and print what would have been written
    #[arg(long)]
    pub dry_run: bool,

    /// Assume the keyspace and tables already exist
    #[arg(long)]
    pub skip_provision: bool,
}

/// Generate snapshots and write them into the configured store
pub async fn load_snapshots<H: Host>(host: &mut H, args: &LoadArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let feed = SnapshotFeed::new(&args.generation, common.config.generator.settings())?;

    if args.dry_run {
        let store = Arc::new(MemoryStore::new());
        let summary = load_into(Arc::clone(&store), &common, feed, args).await?;

        report(host, &summary, args.generation.snapshots);
        for table in Table::VARIANTS {
            let _ = writeln!(
                host.output(),
                "  {:<28} {:>8} rows {:>6} batches",
                table.name(),
                store.rows_written(*table),
                store.batches_executed(*table)
            );
        }

        return Ok(());
    }

    let store = Arc::new(ScyllaStore::connect(&common.config.store.settings()).await?);
    let summary = load_into(store, &common, feed, args).await?;
    report(host, &summary, args.generation.snapshots);

    Ok(())
}

async fn load_into<S: Store + 'static>(store: Arc<S>, common: &Common, mut feed: SnapshotFeed, args: &LoadArgs) -> Result<IngestSummary> {
    let keyspace = common.config.store.keyspace.as_str();

    if !args.skip_provision {
        provision(store.as_ref(), keyspace, common.config.store.replication_factor).await?;
    }

    let ingestor = Ingestor::new(store, keyspace, common.config.ingest.settings()).with_progress(Arc::clone(&common.progress));

    let mut total = IngestSummary::default();
    for index in 0..args.generation.snapshots {
        let start = Instant::now();
        let snapshot = feed.next_snapshot(Utc::now())?;
        let generated = start.elapsed();

        let id = snapshot.id;
        let start = Instant::now();
        let summary = ingestor
            .ingest(snapshot)
            .await
            .map_err(|e| e.enrich_with(|| format!("loading snapshot {} of {}", index + 1, args.generation.snapshots)))?;

        log::info!(
            target: LOG_TARGET,
            "Snapshot {id}: generated in {:.3}s, ingested in {:.3}s",
            generated.as_secs_f64(),
            start.elapsed().as_secs_f64()
        );

        total += summary;
    }

    Ok(total)
}

fn report<H: Host>(host: &mut H, summary: &IngestSummary, snapshots: usize) {
    let _ = writeln!(
        host.output(),
        "Loaded {snapshots} snapshot(s): {} manifests, {} dependencies (runtime={}, development={}, transitive={})",
        summary.manifests,
        summary.dependencies(),
        summary.runtime,
        summary.development,
        summary.transitives
    );
}
