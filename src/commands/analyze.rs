use std::path::Path;

use anyhow::Result;
use photodex_core::catalog::Catalog;
use photodex_core::config::Config;
use photodex_core::{bursts, duplicates};

pub fn run(catalog: &Path, hamming_threshold: u32) -> Result<()> {
    let mut config = Config::new(catalog.to_path_buf());
    config.analysis_hamming_threshold = hamming_threshold;
    config.validate()?;

    let mut cat = Catalog::open(catalog)?;

    let groups = bursts::detect_and_store(&mut cat, &config)?;
    println!("burst groups:      {}", groups.len());

    let clusters = duplicates::detect_and_store(&mut cat, &config)?;
    println!("duplicate clusters: {}", clusters.len());
    for cluster in &clusters {
        println!(
            "  {} ({}, {} photos, max distance {})",
            cluster.id,
            cluster.cluster_type,
            cluster.member_ids.len(),
            cluster.max_distance,
        );
    }

    Ok(())
}
