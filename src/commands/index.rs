use std::path::{Path, PathBuf};

use anyhow::Result;
use photodex_core::config::Config;
use photodex_core::orchestrator;

pub fn run(catalog: &Path, root: &Path, workers: usize, perf_stats: bool) -> Result<()> {
    let mut config = Config::new(PathBuf::from(catalog));
    config.workers = workers;
    config.perf_stats = perf_stats;
    config.validate()?;

    log::info!("indexing {} into {}", root.display(), catalog.display());
    let snapshot = orchestrator::run(root, &config)?;

    println!("found:    {}", snapshot.found);
    println!("indexed:  {}", snapshot.processed);
    println!("updated:  {}", snapshot.updated);
    println!("skipped:  {}", snapshot.skipped);
    println!("failed:   {}", snapshot.failed);
    for (kind, count) in &snapshot.failures_by_kind {
        println!("  {kind}: {count}");
    }
    if perf_stats {
        for (stage, elapsed) in &snapshot.stage_timings {
            println!("  {stage}: {elapsed:?}");
        }
    }

    Ok(())
}
