use std::path::Path;

use anyhow::Result;
use photodex_core::catalog::Catalog;
use photodex_core::query;

pub fn run(catalog: &Path, filters: &str) -> Result<()> {
    let cat = Catalog::open(catalog)?;
    let filters = query::parse_query_string(filters);
    let (results, total) = query::search(&cat, &filters)?;

    println!("{total} matching photo(s), showing {}", results.len());
    println!("{:<6} {:<50} {:<12} {}", "ID", "Path", "Camera", "Date");
    println!("{}", "-".repeat(100));
    for photo in &results {
        println!(
            "{:<6} {:<50} {:<12} {}",
            photo.id,
            photo.path,
            photo.camera_make.as_deref().unwrap_or("-"),
            photo.date_taken.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
