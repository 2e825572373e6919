use std::path::Path;

use anyhow::Result;
use photodex_core::catalog::Catalog;

pub fn run(catalog: &Path) -> Result<()> {
    let cat = Catalog::open(catalog)?;
    let stats = cat.stats()?;

    println!("photos:             {}", stats.photo_count);
    println!("thumbnails:         {}", stats.thumbnail_count);
    println!("colour samples:     {}", stats.color_count);
    println!("burst groups:       {}", stats.burst_group_count);
    println!("duplicate clusters: {}", stats.duplicate_cluster_count);

    Ok(())
}
